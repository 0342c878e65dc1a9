//! Integration tests for scaled arrays

mod common;

use common::{GatedRegistry, HostRegistry, assert_close, vector};
use datawidgets::model::{WidgetRef, WidgetRegistry};
use datawidgets::{
    DataError, DataSource, DataType, LinearScale, Model, NdArray, NdArrayModel, Recomputed,
    ScaleRef, ScaledArrayModel, SetOptions, UnionWire, Value, Widget, WidgetManager,
    WriteBack, get_array, listen_to_union, set_array,
};
use futures::FutureExt;
use futures::executor::block_on;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn example_scale() -> ScaleRef {
    Rc::new(LinearScale::new([0.0, 10.0], [-10.0, -5.0]))
}

fn example_source() -> NdArray {
    NdArray::from_slice(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 10.0], vec![2, 3]).unwrap()
}

fn record_events(model: &ScaledArrayModel) -> (Rc<RefCell<Vec<bool>>>, datawidgets::model::Subscription) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let e = events.clone();
    let sub = model.on_recomputed(move |event: &Recomputed| e.borrow_mut().push(event.resized));
    (events, sub)
}

// =============================================================================
// Computation
// =============================================================================

#[test_log::test]
fn linear_scale_example() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let scaled = model.scaled_data().unwrap();
    assert_eq!(scaled.shape(), &[2, 3]);
    assert_eq!(scaled.dtype(), DataType::Float64);
    assert_close(&scaled.to_f64_vec(), &[-9.5, -9.0, -8.5, -8.0, -7.5, -5.0]);
}

#[test]
fn derived_storage_never_aliases_source() {
    let source = example_source();
    let model = ScaledArrayModel::new("s", Some(source.clone().into()), Some(Rc::new(|x: f64| x)));
    let scaled = model.scaled_data().unwrap();
    assert!(!scaled.data().ptr_eq(source.data()));
    assert_eq!(scaled, source);
}

#[test]
fn untyped_source_scales() {
    let source = NdArray::vector(datawidgets::ArrayData::values(vec![1.0, 2.0]));
    let model = ScaledArrayModel::new("s", Some(source.into()), Some(Rc::new(|x: f64| -x)));
    let scaled = model.scaled_data().unwrap();
    assert_eq!(scaled.dtype(), DataType::Array);
    assert_eq!(scaled.to_f64_vec(), vec![-1.0, -2.0]);
}

#[test]
fn integer_source_keeps_dtype() {
    let source = NdArray::from_slice(&[1u8, 2, 3], vec![3]).unwrap();
    let model = ScaledArrayModel::new("s", Some(source.into()), Some(Rc::new(|x: f64| x * 2.5)));
    let scaled = model.scaled_data().unwrap();
    assert_eq!(scaled.dtype(), DataType::Uint8);
    assert_eq!(scaled.to_f64_vec(), vec![2.0, 5.0, 7.0]);
}

// =============================================================================
// Recompute events
// =============================================================================

#[test_log::test]
fn clearing_source_fires_resized() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let (events, _sub) = record_events(&model);

    model.set_source(None);
    assert_eq!(*events.borrow(), vec![true]);
    assert!(model.scaled_data().is_none());

    // Already empty: nothing to report
    model.set_scale(Some(Rc::new(|x: f64| x)));
    assert_eq!(*events.borrow(), vec![true]);
}

#[test_log::test]
fn value_edit_reuses_derived_buffer() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let before = model.scaled_data().unwrap();
    let (events, _sub) = record_events(&model);

    let edited = NdArray::from_slice(&[0.0f64, 0.0, 0.0, 10.0, 10.0, 10.0], vec![2, 3]).unwrap();
    model.set_source(Some(edited.into()));

    assert_eq!(*events.borrow(), vec![false]);
    let after = model.scaled_data().unwrap();
    assert!(after.ptr_eq(&before));
    // Holders of the old derived array observe the new values
    assert_close(&before.to_f64_vec(), &[-10.0, -10.0, -10.0, -5.0, -5.0, -5.0]);
}

#[test_log::test]
fn shape_change_reallocates() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let before = model.scaled_data().unwrap();
    let (events, _sub) = record_events(&model);

    let reshaped = NdArray::from_slice(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 10.0], vec![3, 2]).unwrap();
    model.set_source(Some(reshaped.into()));

    assert_eq!(*events.borrow(), vec![true]);
    let after = model.scaled_data().unwrap();
    assert!(!after.data().ptr_eq(before.data()));
    assert_eq!(after.shape(), &[3, 2]);
}

#[test_log::test]
fn dtype_change_reallocates() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let before = model.scaled_data().unwrap();
    let (events, _sub) = record_events(&model);

    let narrowed = NdArray::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 10.0], vec![2, 3]).unwrap();
    model.set_source(Some(narrowed.into()));

    assert_eq!(*events.borrow(), vec![true]);
    let after = model.scaled_data().unwrap();
    assert!(!after.data().ptr_eq(before.data()));
    assert_eq!(after.dtype(), DataType::Float32);
    assert_close(&after.to_f64_vec(), &[-9.5, -9.0, -8.5, -8.0, -7.5, -5.0]);
}

#[test]
fn restore_after_clear_allocates_then_reuses() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let (events, _sub) = record_events(&model);

    model.set_source(None);
    model.set_source(Some(example_source().into()));
    model.set_source(Some(example_source().into()));
    assert_eq!(*events.borrow(), vec![true, true, false]);
}

#[test]
fn scale_replacement_recomputes_once() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let (events, _sub) = record_events(&model);

    model.set_scale(Some(Rc::new(|x: f64| x * 2.0)));
    assert_eq!(*events.borrow(), vec![false]);
    assert_close(
        &model.scaled_data().unwrap().to_f64_vec(),
        &[2.0, 4.0, 6.0, 8.0, 10.0, 20.0],
    );

    model.set_scale(None);
    assert_eq!(*events.borrow(), vec![false, true]);
}

#[test_log::test]
fn source_and_scale_in_one_write_recompute_once() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let (events, _sub) = record_events(&model);

    let doubled: ScaleRef = Rc::new(|x: f64| x * 2.0);
    let edited = NdArray::from_slice(&[1.0f64; 6], vec![2, 3]).unwrap();
    model.model().set_many(
        [
            ("array".to_string(), Value::from(edited)),
            ("scale".to_string(), Value::from(doubled)),
        ],
        SetOptions::default(),
    );

    assert_eq!(*events.borrow(), vec![false]);
    assert_close(&model.scaled_data().unwrap().to_f64_vec(), &[2.0; 6]);
}

#[test]
fn unrelated_attribute_recomputes() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let (events, _sub) = record_events(&model);
    model.model().set("compression_level", 3i64);
    assert_eq!(*events.borrow(), vec![false]);
}

// =============================================================================
// Referenced sources
// =============================================================================

#[test_log::test]
fn referenced_source_edits_propagate() {
    let source = NdArrayModel::new("src", Some(example_source()));
    let model = ScaledArrayModel::new(
        "s",
        Some((source.clone() as WidgetRef).into()),
        Some(example_scale()),
    );
    let (events, _sub) = record_events(&model);

    let edited = NdArray::from_slice(&[10.0f64; 6], vec![2, 3]).unwrap();
    source.set_array(Some(edited));

    assert_eq!(*events.borrow(), vec![false]);
    assert_close(&model.scaled_data().unwrap().to_f64_vec(), &[-5.0; 6]);
}

#[test_log::test]
fn reference_swap_recomputes() {
    let a = NdArrayModel::new("a", Some(example_source()));
    let b = NdArrayModel::new(
        "b",
        Some(NdArray::from_slice(&[0.0f64; 6], vec![2, 3]).unwrap()),
    );
    let model = ScaledArrayModel::new("s", Some((a.clone() as WidgetRef).into()), Some(example_scale()));
    let (events, _sub) = record_events(&model);

    model.set_source(Some((b.clone() as WidgetRef).into()));
    assert_eq!(*events.borrow(), vec![false]);
    assert_close(&model.scaled_data().unwrap().to_f64_vec(), &[-10.0; 6]);

    // Only the current reference is followed
    a.set_array(Some(NdArray::from_slice(&[5.0f64; 6], vec![2, 3]).unwrap()));
    assert_eq!(events.borrow().len(), 1);
}

#[test_log::test]
fn recomputation_is_a_data_change_for_referencing_widgets() {
    let scaled: Rc<ScaledArrayModel> =
        ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let owner = Model::with_attributes("owner", "Owner", [("data", scaled.clone() as WidgetRef)]);
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    let _listener = listen_to_union(&owner, "data", move || c.set(c.get() + 1), false);

    scaled.set_scale(Some(Rc::new(|x: f64| x + 1.0)));
    assert_eq!(count.get(), 1);

    let unwrapped = get_array(&owner.get("data"), None).unwrap();
    assert_close(&unwrapped.to_f64_vec(), &[2.0, 3.0, 4.0, 5.0, 6.0, 11.0]);
}

#[test]
fn chained_scaled_arrays() {
    let inner = ScaledArrayModel::new("inner", Some(example_source().into()), Some(Rc::new(|x: f64| x * 2.0)));
    let outer = ScaledArrayModel::new(
        "outer",
        Some((inner.clone() as WidgetRef).into()),
        Some(Rc::new(|x: f64| x + 1.0)),
    );
    assert_close(
        &outer.scaled_data().unwrap().to_f64_vec(),
        &[3.0, 5.0, 7.0, 9.0, 11.0, 21.0],
    );

    inner.set_scale(Some(Rc::new(|x: f64| x * 0.0)));
    assert_close(&outer.scaled_data().unwrap().to_f64_vec(), &[1.0; 6]);
}

// =============================================================================
// Write-back
// =============================================================================

#[test_log::test]
fn derived_write_back_inverts_into_source() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let target = NdArray::from_slice(&[-10.0f64, -9.0, -8.0, -7.0, -6.0, -5.0], vec![2, 3]).unwrap();

    assert!(model.can_write_back(None));
    model
        .set_ndarray(Some(target), None, SetOptions::default())
        .unwrap();

    let source = model.source().unwrap();
    assert_eq!(source.dtype(), DataType::Float64);
    assert_close(&source.to_f64_vec(), &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    assert_close(
        &model.scaled_data().unwrap().to_f64_vec(),
        &[-10.0, -9.0, -8.0, -7.0, -6.0, -5.0],
    );
}

#[test_log::test]
fn write_back_reaches_referenced_source() {
    let source = NdArrayModel::new("src", Some(NdArray::from_slice(&[1i32, 2], vec![2]).unwrap()));
    let model = ScaledArrayModel::new(
        "s",
        Some((source.clone() as WidgetRef).into()),
        Some(Rc::new(LinearScale::new([0.0, 4.0], [0.0, 8.0]))),
    );

    let target = NdArray::from_slice(&[6.0f32, 8.0], vec![2]).unwrap();
    model
        .set_ndarray(Some(target), None, SetOptions::default())
        .unwrap();

    // The reference stays in place, the referenced widget holds the new data
    assert!(model.model().get("array").is_widget());
    let written = source.array().unwrap();
    assert_eq!(written.dtype(), DataType::Int32);
    assert_eq!(written.data().as_typed().unwrap().to_vec::<i32>().unwrap(), vec![3, 4]);
    assert_close(&model.scaled_data().unwrap().to_f64_vec(), &[6.0, 8.0]);
}

#[test]
fn write_back_through_owner_attribute() {
    let scaled = ScaledArrayModel::new(
        "s",
        Some(vector(&[1.0, 2.0]).into()),
        Some(Rc::new(LinearScale::new([0.0, 1.0], [0.0, 2.0]))),
    );
    let owner = Model::with_attributes("owner", "Owner", [("data", scaled.clone() as WidgetRef)]);

    set_array(&owner, "data", Some(vector(&[4.0, 6.0])), SetOptions::default()).unwrap();
    assert_close(&scaled.source().unwrap().to_f64_vec(), &[2.0, 3.0]);
    assert_eq!(scaled.source().unwrap().dtype(), DataType::Float32);
}

#[test]
fn non_invertible_scale_rejects_write_back() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(Rc::new(|x: f64| x * x)));
    assert!(!model.can_write_back(None));
    let result = model.set_ndarray(Some(example_source()), None, SetOptions::default());
    assert!(matches!(result, Err(DataError::NotWritable(key)) if key == "scaledData"));
}

#[test]
fn null_write_back_clears_source() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    model
        .set_ndarray(None, None, SetOptions::default())
        .unwrap();
    assert!(model.source().is_none());
    assert!(model.scaled_data().is_none());
}

#[test]
fn source_key_write_back() {
    let model = ScaledArrayModel::new("s", None, Some(Rc::new(|x: f64| x + 1.0)));
    assert!(model.can_write_back(Some("array")));
    model
        .set_ndarray(Some(vector(&[1.0])), Some("array"), SetOptions::default())
        .unwrap();
    assert_eq!(model.get_ndarray(None).unwrap().to_f64_vec(), vec![2.0]);
}

// =============================================================================
// Two-phase construction
// =============================================================================

#[test_log::test]
fn ready_resolves_reference() {
    let manager = WidgetManager::new();
    manager.register(NdArrayModel::new("src", Some(example_source())));
    let registry: Rc<dyn WidgetRegistry> = Rc::new(manager);

    let model = ScaledArrayModel::from_state(
        "s",
        Some(UnionWire::Reference("IPY_MODEL_src".into())),
        Some(example_scale()),
        registry,
    );
    assert!(!model.is_ready());

    block_on(model.ready()).unwrap();
    assert!(model.is_ready());
    assert_close(
        &model.scaled_data().unwrap().to_f64_vec(),
        &[-9.5, -9.0, -8.5, -8.0, -7.5, -5.0],
    );
    assert_eq!(
        model.state().unwrap(),
        Some(UnionWire::Reference("IPY_MODEL_src".into()))
    );
}

#[test]
fn ready_is_shared() {
    let model = ScaledArrayModel::from_state(
        "s",
        None,
        Some(example_scale()),
        Rc::new(WidgetManager::new()),
    );
    let first = model.ready();
    let second = model.ready();
    block_on(first).unwrap();
    block_on(second).unwrap();
    assert!(model.is_ready());
    assert!(model.scaled_data().is_none());
}

#[test_log::test]
fn failed_resolution_rejects_ready() {
    let model = ScaledArrayModel::from_state(
        "s",
        Some(UnionWire::Reference("IPY_MODEL_missing".into())),
        Some(example_scale()),
        Rc::new(WidgetManager::new()),
    );
    let result = block_on(model.ready());
    assert!(matches!(result, Err(DataError::UnknownModel(id)) if id == "missing"));
    assert!(!model.is_ready());

    // Writes after a failed start still recompute and report
    let (events, _sub) = record_events(&model);
    model.set_source(Some(example_source().into()));
    assert_eq!(*events.borrow(), vec![true]);
    assert_close(
        &model.scaled_data().unwrap().to_f64_vec(),
        &[-9.5, -9.0, -8.5, -8.0, -7.5, -5.0],
    );

    model.set_source(None);
    assert_eq!(*events.borrow(), vec![true, true]);
    assert!(model.scaled_data().is_none());
}

#[test]
fn state_uses_host_tokens() {
    let manager = WidgetManager::new();
    manager.register(NdArrayModel::new("src", Some(example_source())));
    let token = UnionWire::Reference("IPY_MODEL_host-src".into());

    let model = ScaledArrayModel::from_state(
        "s",
        Some(token.clone()),
        Some(example_scale()),
        Rc::new(HostRegistry::new(manager)),
    );
    block_on(model.ready()).unwrap();
    assert_eq!(model.source().unwrap(), example_source());
    assert_eq!(model.state().unwrap(), Some(token));
}

#[test_log::test]
fn pending_model_defers_computation() {
    let manager = WidgetManager::new();
    manager.register(NdArrayModel::new("src", Some(example_source())));
    let registry = Rc::new(GatedRegistry::new(manager));

    let model = ScaledArrayModel::from_state(
        "s",
        Some(UnionWire::Reference("IPY_MODEL_src".into())),
        Some(example_scale()),
        registry.clone(),
    );
    let (events, _sub) = record_events(&model);

    assert!(model.ready().now_or_never().is_none());
    assert!(model.scaled_data().is_none());
    assert!(events.borrow().is_empty());

    registry.open();
    block_on(model.ready()).unwrap();
    assert_eq!(*events.borrow(), vec![true]);
    assert!(model.scaled_data().is_some());
}

#[test_log::test]
fn source_set_while_resolving_wins() {
    let manager = WidgetManager::new();
    manager.register(NdArrayModel::new("src", Some(example_source())));
    let registry = Rc::new(GatedRegistry::new(manager));

    let model = ScaledArrayModel::from_state(
        "s",
        Some(UnionWire::Reference("IPY_MODEL_src".into())),
        Some(Rc::new(|x: f64| x * 10.0)),
        registry.clone(),
    );
    assert!(model.ready().now_or_never().is_none());

    model.set_source(Some(vector(&[7.0]).into()));
    registry.open();
    block_on(model.ready()).unwrap();

    assert!(!model.model().get("array").is_widget());
    assert_eq!(model.scaled_data().unwrap().to_f64_vec(), vec![70.0]);
}

#[test]
fn inline_state_roundtrip() {
    let model = ScaledArrayModel::new("s", Some(example_source().into()), Some(example_scale()));
    let state = model.state().unwrap();
    let restored = ScaledArrayModel::from_state("t", state, Some(example_scale()), Rc::new(WidgetManager::new()));
    block_on(restored.ready()).unwrap();
    assert_eq!(restored.source().unwrap(), example_source());
}

#[test]
fn capability_view() {
    let model = ScaledArrayModel::new("s", None, None);
    let widget: WidgetRef = model;
    assert!(widget.as_data_source().is_some());
    assert!(widget.as_write_back().is_some());
    assert_eq!(widget.model().name(), "ScaledArrayModel");
}
