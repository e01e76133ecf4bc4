use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::marshal::{CompoundBuilder, Endianness, EnumType, MarshalError, NumericCategory, Result, Type, TypeRef, VECTOR_CONTAINER};

const DEFAULT_ENUM_SIZE: usize = 4;

/// JSON document describing a set of types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDoc {
	/// Byte order for numerics and enums that do not set their own.
	#[serde(default)]
	pub endianness: ByteOrder,
	/// Type definitions, in any order.
	pub types: Vec<TypeDef>,
}

/// Byte order as written in schema documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
	/// Least significant byte first.
	#[default]
	Little,
	/// Most significant byte first.
	Big,
	/// Byte order of the host.
	Native,
}

impl ByteOrder {
	fn resolve(self) -> Endianness {
		match self {
			Self::Little => Endianness::Little,
			Self::Big => Endianness::Big,
			Self::Native => Endianness::native(),
		}
	}
}

/// One type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDef {
	/// Integer or float scalar.
	Numeric {
		/// Type name.
		name: String,
		/// Signed, unsigned, or float.
		category: NumericCategory,
		/// Byte width.
		size: usize,
		/// Byte order override.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		endianness: Option<ByteOrder>,
	},
	/// Enumeration.
	Enum {
		/// Type name.
		name: String,
		/// Byte width of the stored integer.
		#[serde(default = "default_enum_size")]
		size: usize,
		/// Byte order override.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		endianness: Option<ByteOrder>,
		/// `(symbol, value)` pairs.
		symbols: Vec<(String, i64)>,
	},
	/// Opaque blob; no size makes it abstract.
	Opaque {
		/// Type name.
		name: String,
		/// Byte size.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		size: Option<usize>,
	},
	/// Fixed-length array.
	Array {
		/// Type name.
		name: String,
		/// Element type name.
		element: String,
		/// Element count.
		length: usize,
	},
	/// Length-prefixed container.
	Container {
		/// Type name.
		name: String,
		/// Element type name.
		element: String,
		/// Template name, `/std/vector` when absent.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		container: Option<String>,
	},
	/// Struct or union.
	Compound {
		/// Type name.
		name: String,
		/// Declared total size.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		size: Option<usize>,
		/// Overlay every field at offset zero.
		#[serde(default)]
		union: bool,
		/// Fields in declaration order.
		fields: Vec<FieldDef>,
	},
}

/// One compound field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
	/// Field identifier.
	pub name: String,
	/// Field type name.
	#[serde(rename = "type")]
	pub ty: String,
	/// Explicit byte offset; packed after the previous field when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub offset: Option<usize>,
}

fn default_enum_size() -> usize {
	DEFAULT_ENUM_SIZE
}

impl TypeDef {
	/// Name of the defined type.
	pub fn name(&self) -> &str {
		match self {
			Self::Numeric { name, .. }
			| Self::Enum { name, .. }
			| Self::Opaque { name, .. }
			| Self::Array { name, .. }
			| Self::Container { name, .. }
			| Self::Compound { name, .. } => name,
		}
	}

	fn dependencies(&self) -> Vec<&str> {
		match self {
			Self::Array { element, .. } | Self::Container { element, .. } => vec![element.as_str()],
			Self::Compound { fields, .. } => fields.iter().map(|field| field.ty.as_str()).collect(),
			_ => Vec::new(),
		}
	}
}

/// Name-indexed set of type descriptors.
#[derive(Debug, Clone, Default)]
pub struct Registry {
	types: BTreeMap<String, TypeRef>,
}

impl Registry {
	/// Empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse a schema document and build every type it defines.
	pub fn from_json_str(text: &str) -> Result<Self> {
		let doc: SchemaDoc = serde_json::from_str(text)?;
		let mut registry = Self::new();
		registry.load_doc(&doc)?;
		Ok(registry)
	}

	/// Read and build a schema document from disk.
	pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
		let text = fs::read_to_string(path)?;
		Self::from_json_str(&text)
	}

	/// Register a descriptor under its own name.
	pub fn insert(&mut self, ty: TypeRef) -> Result<()> {
		if self.types.contains_key(ty.name()) {
			return Err(MarshalError::InvalidDefinition {
				type_name: ty.name().to_owned(),
				reason: "type is already defined".to_owned(),
			});
		}
		self.types.insert(ty.name().to_owned(), ty);
		Ok(())
	}

	/// Descriptor by name.
	pub fn get(&self, name: &str) -> Option<&TypeRef> {
		self.types.get(name)
	}

	/// Descriptor by name, failing with [`MarshalError::UnknownType`].
	pub fn resolve(&self, name: &str) -> Result<TypeRef> {
		self.get(name).cloned().ok_or_else(|| MarshalError::UnknownType { name: name.to_owned() })
	}

	/// Descriptors sorted by name.
	pub fn iter(&self) -> impl Iterator<Item = &TypeRef> {
		self.types.values()
	}

	/// Number of registered types.
	pub fn len(&self) -> usize {
		self.types.len()
	}

	/// Whether no type is registered.
	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}

	/// Build every definition of `doc`; definitions may reference each other
	/// in any order and may reference types already registered.
	pub fn load_doc(&mut self, doc: &SchemaDoc) -> Result<()> {
		let mut defs: HashMap<&str, &TypeDef> = HashMap::with_capacity(doc.types.len());
		for def in &doc.types {
			if defs.insert(def.name(), def).is_some() || self.types.contains_key(def.name()) {
				return Err(MarshalError::InvalidDefinition {
					type_name: def.name().to_owned(),
					reason: "type is already defined".to_owned(),
				});
			}
		}

		let mut builder = DocBuilder {
			defs,
			endianness: doc.endianness.resolve(),
			visiting: Vec::new(),
		};
		for def in &doc.types {
			builder.build(self, def.name())?;
		}
		debug!(types = doc.types.len(), total = self.len(), "loaded schema document");
		Ok(())
	}
}

struct DocBuilder<'a> {
	defs: HashMap<&'a str, &'a TypeDef>,
	endianness: Endianness,
	visiting: Vec<&'a str>,
}

impl<'a> DocBuilder<'a> {
	fn build(&mut self, registry: &mut Registry, name: &'a str) -> Result<TypeRef> {
		if let Some(ty) = registry.get(name) {
			return Ok(Rc::clone(ty));
		}
		let def = *self.defs.get(name).ok_or_else(|| MarshalError::UnknownType { name: name.to_owned() })?;
		if self.visiting.contains(&name) {
			return Err(MarshalError::InvalidDefinition {
				type_name: name.to_owned(),
				reason: format!("reference cycle through {}", self.visiting.join(" -> ")),
			});
		}

		self.visiting.push(name);
		let mut deps = HashMap::new();
		for dep in def.dependencies() {
			let ty = self.build(registry, dep)?;
			deps.insert(dep, ty);
		}
		self.visiting.pop();

		let ty = self.construct(def, &deps)?;
		registry.insert(Rc::clone(&ty))?;
		Ok(ty)
	}

	fn construct(&self, def: &TypeDef, deps: &HashMap<&str, TypeRef>) -> Result<TypeRef> {
		let dep = |name: &str| deps.get(name).cloned().ok_or_else(|| MarshalError::UnknownType { name: name.to_owned() });
		match def {
			TypeDef::Numeric {
				name,
				category,
				size,
				endianness,
			} => Type::numeric(name.as_str(), *category, *size, self.byte_order(*endianness)),
			TypeDef::Enum {
				name,
				size,
				endianness,
				symbols,
			} => {
				let symbols = symbols.iter().map(|(symbol, value)| (symbol.as_str(), *value));
				let enumeration = EnumType::new(name, *size, self.byte_order(*endianness), symbols)?;
				Ok(Type::enumeration(name.as_str(), enumeration))
			}
			TypeDef::Opaque { name, size } => Ok(Type::opaque(name.as_str(), *size)),
			TypeDef::Array { name, element, length } => Type::named_array(name.as_str(), &dep(element)?, *length),
			TypeDef::Container { name, element, container } => Ok(Type::named_container(
				name.as_str(),
				container.as_deref().unwrap_or(VECTOR_CONTAINER),
				&dep(element)?,
			)),
			TypeDef::Compound { name, size, union, fields } => {
				let mut builder = if *union { CompoundBuilder::union(name.as_str()) } else { CompoundBuilder::new(name.as_str()) };
				for field in fields {
					let ty = dep(&field.ty)?;
					builder = match field.offset {
						Some(offset) => builder.field_at(field.name.as_str(), &ty, offset),
						None => builder.field(field.name.as_str(), &ty),
					};
				}
				if let Some(size) = size {
					builder = builder.size(*size);
				}
				builder.build()
			}
		}
	}

	fn byte_order(&self, own: Option<ByteOrder>) -> Endianness {
		own.map_or(self.endianness, ByteOrder::resolve)
	}
}
