use proptest::prelude::*;

use crate::marshal::{Buffer, Endianness, LoadOptions, MarshalError, NativeValue, NumericCategory, Type, TypeRef, Value};

fn int32() -> TypeRef {
	Type::numeric("/int32_t", NumericCategory::Sint, 4, Endianness::Little).expect("int32")
}

fn ints(values: &[i64]) -> NativeValue {
	NativeValue::from(values.to_vec())
}

fn vector_of(values: &[i64]) -> Value {
	Value::from_native(&Type::container(&int32()), &ints(values)).expect("vector")
}

fn wire(values: &[i32]) -> Vec<u8> {
	let mut out = (values.len() as u64).to_be_bytes().to_vec();
	for value in values {
		out.extend_from_slice(&value.to_le_bytes());
	}
	out
}

#[test]
fn empty_buffer_becomes_an_empty_container() {
	let value = Value::wrap(&Type::container(&int32()), Buffer::new(0)).expect("wrap");
	assert_eq!(value.len().expect("len"), 0);
	assert_eq!(value.to_bytes().expect("bytes"), vec![0; 8]);
}

#[test]
fn shrinking_truncates_the_wire_form() {
	let value = vector_of(&[10, 20, 30, 40]);
	value.resize(3).expect("resize");
	value.apply_changes().expect("apply");
	assert_eq!(value.to_bytes().expect("bytes"), wire(&[10, 20, 30]));
}

#[test]
fn growing_appends_zeroed_elements() {
	let value = vector_of(&[10, 20, 30, 40]);
	value.resize(5).expect("resize");
	value.apply_changes().expect("apply");
	assert_eq!(value.to_bytes().expect("bytes"), wire(&[10, 20, 30, 40, 0]));
}

#[test]
fn pushed_elements_stay_pending_until_applied() {
	let value = vector_of(&[1]);
	let item = Value::from_native(&int32(), &NativeValue::I64(2)).expect("item");
	value.push(&item).expect("push");
	assert_eq!(value.len().expect("len"), 2);
	assert_eq!(value.buffer().to_vec(), wire(&[1]));

	item.set_native(&NativeValue::I64(99)).expect("mutate source");
	assert_eq!(value.to_bytes().expect("bytes"), wire(&[1, 2]));
}

#[test]
fn cached_elements_follow_the_rebuilt_buffer() {
	let value = vector_of(&[1, 2]);
	let first = value.element(0).expect("first");
	value.push(&Value::from_native(&int32(), &NativeValue::I64(3)).expect("three")).expect("push");
	let third = value.element(2).expect("pending");
	value.apply_changes().expect("apply");

	first.set_native(&NativeValue::I64(5)).expect("write first");
	third.set_native(&NativeValue::I64(7)).expect("write third");
	assert!(first.buffer().same_backing(&value.buffer()));
	assert_eq!(value.buffer().to_vec(), wire(&[5, 2, 7]));
}

#[test]
fn delete_at_keeps_cached_references_valid() {
	let value = vector_of(&[10, 20, 30, 40]);
	let last = value.element(3).expect("last");
	value.delete_at(1).expect("delete");

	assert_eq!(value.to_native().expect("native"), ints(&[10, 30, 40]));
	assert_eq!(last.to_native().expect("still 40"), NativeValue::I64(40));
	assert!(last.ptr_eq(&value.element(2).expect("shifted")));
	assert_eq!(value.to_bytes().expect("bytes"), wire(&[10, 30, 40]));

	last.set_native(&NativeValue::I64(41)).expect("write through shifted view");
	assert_eq!(value.to_bytes().expect("bytes"), wire(&[10, 30, 41]));
}

#[test]
fn delete_at_leaves_aliases_of_the_old_layout_readable() {
	let value = vector_of(&[10, 20, 30, 40]);
	let alias = value.cast(&value.ty()).expect("alias");
	let held = value.buffer();
	let first = value.element(0).expect("first");
	value.delete_at(1).expect("delete");

	assert_eq!(alias.to_native().expect("alias native"), ints(&[10, 20, 30, 40]));
	assert_eq!(held.read(20, 4).expect("old tail"), 40_i32.to_le_bytes().to_vec());
	first.set_native(&NativeValue::I64(11)).expect("write first");
	assert_eq!(value.to_bytes().expect("bytes"), wire(&[11, 30, 40]));
	assert!(!first.buffer().same_backing(&held));
}

#[test]
fn delete_at_shifts_variable_elements() {
	let nested = Type::container(&Type::container(&int32()));
	let value = Value::from_native(&nested, &NativeValue::List(vec![ints(&[1]), ints(&[2, 3]), ints(&[4])])).expect("nested");
	let last = value.element(2).expect("last");
	value.delete_at(0).expect("delete");

	assert_eq!(value.to_native().expect("native"), NativeValue::List(vec![ints(&[2, 3]), ints(&[4])]));
	assert!(last.ptr_eq(&value.element(1).expect("shifted")));
}

#[test]
fn bounds_are_checked_at_len_and_minus_one() {
	let value = vector_of(&[1, 2]);
	let item = Value::new(&int32()).expect("item");
	assert!(matches!(value.element(2), Err(MarshalError::IndexOutOfRange { index: 2, len: 2 })));
	assert!(matches!(value.element(usize::MAX), Err(MarshalError::IndexOutOfRange { .. })));
	assert!(matches!(value.set_element(2, &item), Err(MarshalError::IndexOutOfRange { .. })));
	assert!(matches!(value.set_element(usize::MAX, &item), Err(MarshalError::IndexOutOfRange { .. })));
	assert!(matches!(value.delete_at(2), Err(MarshalError::IndexOutOfRange { .. })));
}

#[test]
fn delete_if_visits_loaded_and_pending_elements_once() {
	let value = vector_of(&[1, 2, 3]);
	for extra in [4, 5] {
		value.push(&Value::from_native(&int32(), &NativeValue::I64(extra)).expect("extra")).expect("push");
	}

	let mut visited = Vec::new();
	let removed = value
		.delete_if(|element| {
			let number = element.to_native()?.as_i64().unwrap_or_default();
			visited.push(number);
			Ok(number % 2 == 0)
		})
		.expect("delete_if");

	assert_eq!(removed, 2);
	assert_eq!(visited, vec![1, 2, 3, 4, 5]);
	assert_eq!(value.to_bytes().expect("bytes"), wire(&[1, 3, 5]));
}

#[test]
fn predicate_errors_stop_delete_if() {
	let value = vector_of(&[1, 2]);
	let err = value.delete_if(|_| Err(MarshalError::UnknownType { name: "boom".to_owned() })).expect_err("propagated");
	assert!(matches!(err, MarshalError::UnknownType { .. }));
	assert_eq!(value.len().expect("len"), 2);
}

#[test]
fn pop_returns_a_detached_copy() {
	let value = vector_of(&[1, 2]);
	let popped = value.pop().expect("pop").expect("non-empty");
	assert_eq!(popped.to_native().expect("native"), NativeValue::I64(2));
	assert_eq!(value.to_bytes().expect("bytes"), wire(&[1]));

	popped.set_native(&NativeValue::I64(9)).expect("write popped");
	assert_eq!(value.to_bytes().expect("bytes"), wire(&[1]));

	value.clear().expect("clear");
	assert!(value.pop().expect("pop empty").is_none());
}

#[test]
fn extend_from_checks_every_type_first() {
	let value = vector_of(&[1]);
	let good = Value::from_native(&int32(), &NativeValue::I64(2)).expect("good");
	let bad = Value::new(&Type::numeric("/double", NumericCategory::Float, 8, Endianness::Little).expect("double")).expect("bad");

	let err = value.extend_from(&[good.clone(), bad]).expect_err("mixed types");
	assert!(matches!(err, MarshalError::TypeMismatch { .. }));
	assert_eq!(value.len().expect("len"), 1);

	value.extend_from(&[good.clone(), good]).expect("extend");
	assert_eq!(value.to_native().expect("native"), ints(&[1, 2, 2]));
}

#[test]
fn data_only_export_strips_the_header() {
	let value = vector_of(&[7, 8]);
	let mut expected = 7_i32.to_le_bytes().to_vec();
	expected.extend_from_slice(&8_i32.to_le_bytes());
	assert_eq!(value.to_bytes_data_only().expect("data"), expected);

	let scalar = Value::new(&int32()).expect("scalar");
	assert!(matches!(scalar.to_bytes_data_only(), Err(MarshalError::WrongKind { .. })));
}

#[test]
fn variable_elements_are_isolated_until_applied() {
	let nested = Type::container(&Type::container(&int32()));
	let value = Value::from_native(&nested, &NativeValue::List(vec![ints(&[1]), ints(&[2, 3])])).expect("nested");
	let before = value.buffer().to_vec();

	let inner = value.element(1).expect("inner");
	inner.push(&Value::from_native(&int32(), &NativeValue::I64(4)).expect("four")).expect("push");
	inner.element(0).expect("first").set_native(&NativeValue::I64(20)).expect("write");
	assert_eq!(value.buffer().to_vec(), before);

	value.apply_changes().expect("apply");
	assert_eq!(value.to_native().expect("native"), NativeValue::List(vec![ints(&[1]), ints(&[20, 3, 4])]));

	let applied = value.buffer().to_vec();
	inner.push(&Value::from_native(&int32(), &NativeValue::I64(5)).expect("five")).expect("push again");
	assert_eq!(value.buffer().to_vec(), applied);
	assert_eq!(value.to_native().expect("native").as_list().expect("list")[1], ints(&[20, 3, 4, 5]));
}

#[test]
fn load_options_bound_untrusted_counts() {
	let ty = Type::container(&int32());
	let huge = 1_000_u64.to_be_bytes();
	let opt = LoadOptions {
		max_elements: 10,
		..LoadOptions::default()
	};
	assert!(matches!(Value::from_bytes_with(&ty, &huge, &opt), Err(MarshalError::ContainerTooLarge { count: 1000, max: 10 })));
	assert!(matches!(Value::from_bytes(&ty, &huge), Err(MarshalError::OutOfBounds { .. })));

	let mut padded = wire(&[1]);
	padded.push(0xAA);
	assert!(matches!(Value::from_bytes_with(&ty, &padded, &LoadOptions::strict()), Err(MarshalError::TrailingBytes { leftover: 1, .. })));
	let lenient = Value::from_bytes(&ty, &padded).expect("lenient");
	assert_eq!(lenient.to_bytes().expect("bytes"), wire(&[1]));
}

proptest! {
	#[test]
	fn resize_matches_the_wire_model(values in prop::collection::vec(any::<i32>(), 0..16), new_len in 0_usize..24) {
		let value = Value::from_native(&Type::container(&int32()), &NativeValue::List(values.iter().map(|v| NativeValue::I64(i64::from(*v))).collect())).expect("vector");
		value.resize(new_len).expect("resize");

		let mut expected: Vec<i32> = values.iter().copied().take(new_len).collect();
		expected.resize(new_len, 0);
		let bytes = value.to_bytes().expect("bytes");
		prop_assert_eq!(&bytes, &wire(&expected));

		let reloaded = Value::from_bytes_with(&Type::container(&int32()), &bytes, &LoadOptions::strict()).expect("reload");
		prop_assert_eq!(reloaded.len().expect("len"), new_len);
	}
}
