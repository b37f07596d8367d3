//! Wire types for frozen TensorFlow graphs.
//!
//! Only the subset of `graph.proto`, `node_def.proto`, `attr_value.proto`,
//! `tensor.proto` and `tensor_shape.proto` needed to evaluate small
//! convolutional models. Unknown fields are skipped by the decoder.

use std::collections::HashMap;

/// `DT_FLOAT` in `types.proto`.
pub const DT_FLOAT: i32 = 1;
/// `DT_INT32` in `types.proto`.
pub const DT_INT32: i32 = 3;

#[derive(Clone, PartialEq, prost::Message)]
pub struct GraphDef {
    #[prost(message, repeated, tag = "1")]
    pub node: Vec<NodeDef>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NodeDef {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub op: String,
    #[prost(string, repeated, tag = "3")]
    pub input: Vec<String>,
    #[prost(string, tag = "4")]
    pub device: String,
    #[prost(map = "string, message", tag = "5")]
    pub attr: HashMap<String, AttrValue>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AttrValue {
    #[prost(oneof = "attr_value::Value", tags = "1, 2, 3, 4, 5, 6, 7, 8, 9")]
    pub value: Option<attr_value::Value>,
}

pub mod attr_value {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(message, tag = "1")]
        List(super::ListValue),
        #[prost(bytes, tag = "2")]
        S(Vec<u8>),
        #[prost(int64, tag = "3")]
        I(i64),
        #[prost(float, tag = "4")]
        F(f32),
        #[prost(bool, tag = "5")]
        B(bool),
        #[prost(int32, tag = "6")]
        Type(i32),
        #[prost(message, tag = "7")]
        Shape(super::TensorShapeProto),
        #[prost(message, tag = "8")]
        Tensor(super::TensorProto),
        #[prost(string, tag = "9")]
        Placeholder(String),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListValue {
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub s: Vec<Vec<u8>>,
    #[prost(int64, repeated, tag = "3")]
    pub i: Vec<i64>,
    #[prost(float, repeated, tag = "4")]
    pub f: Vec<f32>,
    #[prost(bool, repeated, tag = "5")]
    pub b: Vec<bool>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TensorShapeProto {
    #[prost(message, repeated, tag = "2")]
    pub dim: Vec<tensor_shape_proto::Dim>,
    #[prost(bool, tag = "3")]
    pub unknown_rank: bool,
}

pub mod tensor_shape_proto {
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Dim {
        #[prost(int64, tag = "1")]
        pub size: i64,
        #[prost(string, tag = "2")]
        pub name: String,
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TensorProto {
    #[prost(int32, tag = "1")]
    pub dtype: i32,
    #[prost(message, optional, tag = "2")]
    pub tensor_shape: Option<TensorShapeProto>,
    #[prost(int32, tag = "3")]
    pub version_number: i32,
    #[prost(bytes = "vec", tag = "4")]
    pub tensor_content: Vec<u8>,
    #[prost(float, repeated, tag = "5")]
    pub float_val: Vec<f32>,
    #[prost(int32, repeated, tag = "7")]
    pub int_val: Vec<i32>,
}

impl AttrValue {
    pub fn int(value: i64) -> Self {
        Self {
            value: Some(attr_value::Value::I(value)),
        }
    }

    pub fn string(value: &str) -> Self {
        Self {
            value: Some(attr_value::Value::S(value.as_bytes().to_vec())),
        }
    }

    pub fn int_list(values: &[i64]) -> Self {
        Self {
            value: Some(attr_value::Value::List(ListValue {
                i: values.to_vec(),
                ..Default::default()
            })),
        }
    }

    pub fn tensor(tensor: TensorProto) -> Self {
        Self {
            value: Some(attr_value::Value::Tensor(tensor)),
        }
    }
}

impl TensorProto {
    /// A float tensor with values packed into `tensor_content`, as freezing does.
    pub fn float(shape: &[i64], values: &[f32]) -> Self {
        Self {
            dtype: DT_FLOAT,
            tensor_shape: Some(TensorShapeProto::of(shape)),
            tensor_content: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            ..Default::default()
        }
    }

    /// An int32 tensor using `int_val`, the form small `perm`/`shape`
    /// constants take in exported graphs.
    pub fn int32(shape: &[i64], values: &[i32]) -> Self {
        Self {
            dtype: DT_INT32,
            tensor_shape: Some(TensorShapeProto::of(shape)),
            int_val: values.to_vec(),
            ..Default::default()
        }
    }
}

impl TensorShapeProto {
    fn of(shape: &[i64]) -> Self {
        Self {
            dim: shape
                .iter()
                .map(|&size| tensor_shape_proto::Dim {
                    size,
                    name: String::new(),
                })
                .collect(),
            unknown_rank: false,
        }
    }
}

impl NodeDef {
    pub fn new(name: &str, op: &str, inputs: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            op: op.to_string(),
            input: inputs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: &str, value: AttrValue) -> Self {
        self.attr.insert(key.to_string(), value);
        self
    }
}
