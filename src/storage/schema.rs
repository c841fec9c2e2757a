use std::fmt::Debug;

/// Byte capacity of the string type. Strings are stored as a 4-byte
/// little-endian length followed by exactly this many bytes.
pub const STRING_LEN: usize = 128;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Type {
    Int,
    String,
}

pub fn get_type_length(t: Type) -> usize {
    match t {
        Type::Int => 4,
        Type::String => 4 + STRING_LEN,
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct FieldItem {
    pub field_name: String,
    pub field_type: Type,
}

impl FieldItem {
    pub fn new(field_name: &str, field_type: Type) -> FieldItem {
        FieldItem {
            field_name: field_name.to_string(),
            field_type,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<FieldItem>,
}

impl Schema {
    pub fn new(fields: Vec<FieldItem>) -> Schema {
        Schema { fields }
    }

    pub fn merge(schema1: &Schema, schema2: &Schema) -> Schema {
        let mut fields = schema1.fields.to_vec();
        fields.extend(schema2.fields.to_vec());
        Schema { fields }
    }

    /// get tuple size in bytes
    pub fn get_size(&self) -> usize {
        self.fields
            .iter()
            .map(|f| get_type_length(f.field_type))
            .sum()
    }

    pub fn fields_count(&self) -> usize {
        self.fields.len()
    }

    pub fn get_field_type(&self, i: usize) -> Type {
        self.fields[i].field_type
    }

    pub fn get_field_pos(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.field_name == name)
    }
}

/// Two schemas are equal when the field types match positionally; field
/// names never participate.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for Schema {}

pub fn small_int_schema(width: usize, name_prefix: &str) -> Schema {
    let mut fields: Vec<FieldItem> = Vec::new();
    for i in 0..width {
        let field = FieldItem {
            field_name: format!("{}-{}", name_prefix, i),
            field_type: Type::Int,
        };
        fields.push(field);
    }

    Schema { fields }
}
