use crate::marshal::{CompoundBuilder, Endianness, MarshalError, NativeValue, NumericCategory, Record, Type, TypeRef, Value};

fn int32() -> TypeRef {
	Type::numeric("/int32_t", NumericCategory::Sint, 4, Endianness::Little).expect("int32")
}

fn float64() -> TypeRef {
	Type::numeric("/double", NumericCategory::Float, 8, Endianness::Little).expect("double")
}

fn sample() -> TypeRef {
	CompoundBuilder::new("/Sample")
		.field_at("a", &int32(), 0)
		.field_at("b", &float64(), 4)
		.field_at("c", &int32(), 17)
		.build()
		.expect("sample")
}

fn holder() -> TypeRef {
	CompoundBuilder::new("/Holder")
		.field("id", &int32())
		.field("items", &Type::container(&int32()))
		.field("tail", &int32())
		.build()
		.expect("holder")
}

fn holder_bytes(id: i32, items: &[i32], tail: i32) -> Vec<u8> {
	let mut out = id.to_le_bytes().to_vec();
	out.extend_from_slice(&(items.len() as u64).to_be_bytes());
	for item in items {
		out.extend_from_slice(&item.to_le_bytes());
	}
	out.extend_from_slice(&tail.to_le_bytes());
	out
}

#[test]
fn sample_struct_serializes_with_padding() {
	let native = NativeValue::Record(Record::new().with("a", 10_i64).with("b", 0.1_f64).with("c", 20_i64));
	let value = Value::from_native(&sample(), &native).expect("sample value");

	let mut expected = 10_i32.to_le_bytes().to_vec();
	expected.extend_from_slice(&0.1_f64.to_le_bytes());
	expected.extend_from_slice(&[0; 5]);
	expected.extend_from_slice(&20_i32.to_le_bytes());
	assert_eq!(value.to_bytes().expect("bytes"), expected);
	assert_eq!(value.byte_size().expect("size"), 21);
}

#[test]
fn fixed_fields_alias_the_parent_buffer() {
	let value = Value::new(&sample()).expect("sample value");
	let b = value.field("b").expect("b");
	assert!(b.ptr_eq(&value.field("b").expect("b again")));

	b.set_native(&NativeValue::F64(2.5)).expect("write b");
	assert_eq!(value.buffer().read(4, 8).expect("raw b"), 2.5_f64.to_le_bytes());
	assert_eq!(value.field("b").expect("b").to_native().expect("read b"), NativeValue::F64(2.5));

	let source = Value::from_native(&int32(), &NativeValue::I64(-3)).expect("source");
	let c = value.field("c").expect("c");
	value.set_field("c", &source).expect("set c");
	assert_eq!(c.to_native().expect("view sees it"), NativeValue::I64(-3));
}

#[test]
fn set_field_validates_before_writing() {
	let value = Value::new(&sample()).expect("sample value");
	let wrong = Value::from_native(&float64(), &NativeValue::F64(1.0)).expect("double");
	assert!(matches!(value.set_field("a", &wrong), Err(MarshalError::TypeMismatch { .. })));
	assert!(matches!(value.field("zz"), Err(MarshalError::UnknownField { .. })));

	let before = value.to_bytes().expect("bytes");
	let native = NativeValue::Record(Record::new().with("a", 1_i64).with("zz", 2_i64));
	assert!(matches!(value.set_native(&native), Err(MarshalError::UnknownField { .. })));
	assert_eq!(value.to_bytes().expect("bytes"), before);
}

#[test]
fn variable_fields_are_isolated_until_applied() {
	let native = NativeValue::Record(Record::new().with("id", 1_i64).with("items", vec![2_i64]).with("tail", 3_i64));
	let value = Value::from_native(&holder(), &native).expect("holder value");
	assert_eq!(value.to_bytes().expect("bytes"), holder_bytes(1, &[2], 3));

	let items = value.field("items").expect("items");
	items.push(&Value::from_native(&int32(), &NativeValue::I64(4)).expect("four")).expect("push");
	assert_eq!(value.buffer().to_vec(), holder_bytes(1, &[2], 3));
	assert_eq!(value.field("tail").expect("tail").to_native().expect("tail"), NativeValue::I64(3));

	value.apply_changes().expect("apply");
	assert_eq!(value.buffer().to_vec(), holder_bytes(1, &[2, 4], 3));
	assert!(!items.ptr_eq(&value.field("items").expect("items again")));
	assert_eq!(value.field("tail").expect("tail").to_native().expect("tail"), NativeValue::I64(3));
}

#[test]
fn offset_lookups_scan_once() {
	let value = Value::from_bytes(&holder(), &holder_bytes(1, &[2, 4], 3)).expect("holder value");
	assert_eq!(value.scan_count().expect("scans"), 0);

	let (slot, ty) = value.field_offset_and_size("tail").expect("tail slot");
	assert_eq!((slot.index, slot.offset, slot.size), (2, 20, 4));
	assert_eq!(ty.name(), "/int32_t");
	let scans = value.scan_count().expect("scans");
	assert!(scans > 0);

	assert_eq!(value.field_offset_and_size("tail").expect("tail slot").0, slot);
	let (items, _) = value.field_offset_and_size("items").expect("items slot");
	assert_eq!((items.offset, items.size), (4, 16));
	assert_eq!(value.scan_count().expect("scans"), scans);
}

#[test]
fn fixed_compounds_never_scan() {
	let value = Value::new(&sample()).expect("sample value");
	let (slot, _) = value.field_offset_and_size("c").expect("c slot");
	assert_eq!((slot.offset, slot.size), (17, 4));
	assert_eq!(value.scan_count().expect("scans"), 0);
}

#[test]
fn skips_after_variable_fields_are_zero_filled() {
	let ty = CompoundBuilder::new("/Gapped")
		.field("items", &Type::container(&int32()))
		.field_at("tail", &int32(), 12)
		.build()
		.expect("gapped");
	assert_eq!(ty.min_size(), 16);

	let native = NativeValue::Record(Record::new().with("items", vec![5_i64]).with("tail", 6_i64));
	let value = Value::from_native(&ty, &native).expect("gapped value");
	let mut expected = 1_u64.to_be_bytes().to_vec();
	expected.extend_from_slice(&5_i32.to_le_bytes());
	expected.extend_from_slice(&[0; 4]);
	expected.extend_from_slice(&6_i32.to_le_bytes());
	assert_eq!(value.to_bytes().expect("bytes"), expected);
	assert_eq!(value.field_offset_and_size("tail").expect("tail").0.offset, 16);
}

#[test]
fn nested_variable_compounds_rebuild_bottom_up() {
	let outer = CompoundBuilder::new("/Outer").field("inner", &holder()).field("z", &int32()).build().expect("outer");
	let value = Value::new(&outer).expect("outer value");
	value.field("z").expect("z").set_native(&NativeValue::I64(9)).expect("z");

	let inner = value.field("inner").expect("inner");
	inner.field("items").expect("items").push(&Value::from_native(&int32(), &NativeValue::I64(7)).expect("seven")).expect("push");

	let mut expected = holder_bytes(0, &[7], 0);
	expected.extend_from_slice(&9_i32.to_le_bytes());
	assert_eq!(value.to_bytes().expect("bytes"), expected);
}

#[test]
fn union_members_share_bytes() {
	let uint32 = Type::numeric("/uint32_t", NumericCategory::Uint, 4, Endianness::Little).expect("uint32");
	let float32 = Type::numeric("/float", NumericCategory::Float, 4, Endianness::Little).expect("float");
	let ty = CompoundBuilder::union("/Bits").field("u", &uint32).field("f", &float32).build().expect("union");

	let value = Value::new(&ty).expect("union value");
	value.field("f").expect("f").set_native(&NativeValue::F64(1.0)).expect("write f");
	assert_eq!(value.field("u").expect("u").to_native().expect("read u"), NativeValue::U64(0x3F80_0000));
}

#[test]
fn casts_alias_the_first_field() {
	let value = Value::from_native(&sample(), &NativeValue::Record(Record::new().with("a", 10_i64))).expect("sample value");
	let head = value.cast(&int32()).expect("cast");
	assert_eq!(head.to_native().expect("head"), NativeValue::I64(10));

	head.set_native(&NativeValue::I64(11)).expect("write through cast");
	assert_eq!(value.field("a").expect("a").to_native().expect("a"), NativeValue::I64(11));
	assert!(matches!(value.cast(&float64()), Err(MarshalError::InvalidCast { .. })));
}

#[test]
fn records_round_trip_through_bytes() {
	let native = NativeValue::Record(Record::new().with("id", 5_i64).with("items", vec![1_i64, 2, 3]).with("tail", -1_i64));
	let value = Value::from_native(&holder(), &native).expect("holder value");
	let decoded = value.to_native().expect("native");

	let reloaded = Value::from_bytes(&holder(), &value.to_bytes().expect("bytes")).expect("reload");
	assert_eq!(reloaded.to_native().expect("native"), decoded);
	let record = decoded.as_record().expect("record");
	assert_eq!(&*record.type_name, "/Holder");
	assert_eq!(record.get("items"), Some(&NativeValue::from(vec![1_i64, 2, 3])));
	assert!(value.equals(&reloaded).expect("equals"));
	assert_eq!(value.field_names().expect("names"), vec!["id", "items", "tail"]);
	assert!(value.has_field("tail").expect("has tail"));
	assert!(!value.has_field("head").expect("no head"));
}
