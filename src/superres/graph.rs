//! Compiled inference graph.
//!
//! A `GraphDef` is compiled once into a flat list of typed nodes in
//! topological order, reachable from the output only. Evaluation walks the
//! list once per call and keeps no state between calls.

use std::collections::{HashMap, HashSet};

use ndarray::{ArrayD, Ix4, IxDyn};

use crate::superres::ops::{self, Padding};
use crate::superres::proto::{attr_value::Value, GraphDef, NodeDef, TensorProto, DT_FLOAT, DT_INT32};
use crate::superres::SuperResError;

/// A compiled, immutable graph with a single input and output.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    input: usize,
    output: usize,
}

#[derive(Debug)]
struct Node {
    name: String,
    op: Op,
    inputs: Vec<usize>,
}

#[derive(Debug)]
enum Op {
    Placeholder,
    Const(ArrayD<f32>),
    Identity,
    Conv2D(Padding),
    Add,
    Sub,
    Mul,
    Maximum,
    Minimum,
    Tanh,
    Relu,
    Sigmoid,
    DepthToSpace(usize),
    Transpose,
    Reshape,
}

impl Op {
    fn arity(&self) -> usize {
        match self {
            Op::Placeholder | Op::Const(_) => 0,
            Op::Identity | Op::Tanh | Op::Relu | Op::Sigmoid | Op::DepthToSpace(_) => 1,
            Op::Conv2D(_)
            | Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Maximum
            | Op::Minimum
            | Op::Transpose
            | Op::Reshape => 2,
        }
    }
}

impl Graph {
    /// Compile a decoded graph. `output` names the result node; when absent,
    /// the last non-constant node nothing else consumes is used.
    pub fn compile(def: &GraphDef, output: Option<&str>) -> Result<Self, SuperResError> {
        let index: HashMap<&str, usize> = def
            .node
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.as_str(), i))
            .collect();

        let mut data_inputs = Vec::with_capacity(def.node.len());
        for node in &def.node {
            let mut resolved = Vec::new();
            for raw in &node.input {
                if raw.starts_with('^') {
                    continue;
                }
                let name = input_name(raw).ok_or_else(|| {
                    SuperResError::InvalidGraph(format!(
                        "node '{}' reads secondary output '{}'",
                        node.name, raw
                    ))
                })?;
                let &idx = index.get(name).ok_or_else(|| {
                    SuperResError::InvalidGraph(format!(
                        "node '{}' references unknown input '{}'",
                        node.name, name
                    ))
                })?;
                resolved.push(idx);
            }
            data_inputs.push(resolved);
        }

        let output_idx = match output {
            Some(name) => *index.get(name).ok_or_else(|| {
                SuperResError::InvalidGraph(format!("output node '{name}' not found"))
            })?,
            None => {
                let consumed: HashSet<usize> = data_inputs.iter().flatten().copied().collect();
                (0..def.node.len())
                    .rev()
                    .find(|i| !consumed.contains(i) && def.node[*i].op != "Const")
                    .ok_or_else(|| SuperResError::InvalidGraph("graph has no output node".into()))?
            }
        };

        let order = topo_order(def, &data_inputs, output_idx)?;

        let mut remap = HashMap::with_capacity(order.len());
        let mut nodes = Vec::with_capacity(order.len());
        let mut input = None;
        for &old in &order {
            let def_node = &def.node[old];
            let op = compile_op(def_node)?;
            let inputs: Vec<usize> = data_inputs[old].iter().map(|i| remap[i]).collect();
            if inputs.len() != op.arity() {
                return Err(SuperResError::InvalidGraph(format!(
                    "node '{}' ({}) has {} inputs, expected {}",
                    def_node.name,
                    def_node.op,
                    inputs.len(),
                    op.arity()
                )));
            }
            if matches!(op, Op::Placeholder) {
                if input.is_some() {
                    return Err(SuperResError::InvalidGraph(
                        "graph has more than one Placeholder".into(),
                    ));
                }
                input = Some(nodes.len());
            }
            remap.insert(old, nodes.len());
            nodes.push(Node {
                name: def_node.name.clone(),
                op,
                inputs,
            });
        }

        let input = input
            .ok_or_else(|| SuperResError::InvalidGraph("output does not depend on a Placeholder".into()))?;
        let output = remap[&output_idx];

        tracing::debug!(
            nodes = nodes.len(),
            input = %nodes[input].name,
            output = %nodes[output].name,
            "Graph compiled"
        );

        Ok(Self {
            nodes,
            input,
            output,
        })
    }

    pub fn input_name(&self) -> &str {
        &self.nodes[self.input].name
    }

    pub fn output_name(&self) -> &str {
        &self.nodes[self.output].name
    }

    /// Evaluate the graph with `feed` bound to the placeholder.
    pub fn run(&self, feed: ArrayD<f32>) -> Result<ArrayD<f32>, SuperResError> {
        let mut values: Vec<Option<ArrayD<f32>>> = Vec::with_capacity(self.nodes.len());
        let mut feed = Some(feed);

        for (i, node) in self.nodes.iter().enumerate() {
            let arg = |k: usize| input_value(&values, node, k);
            let fail = |e: SuperResError| match e {
                SuperResError::Shape(msg) => SuperResError::Shape(format!("{}: {}", node.name, msg)),
                other => other,
            };

            let value = match &node.op {
                Op::Placeholder => feed.take().ok_or_else(|| {
                    SuperResError::InvalidGraph("placeholder evaluated twice".into())
                })?,
                Op::Const(t) => t.clone(),
                Op::Identity => arg(0)?.clone(),
                Op::Conv2D(padding) => {
                    let x = as4(arg(0)?, &node.name)?;
                    let f = as4(arg(1)?, &node.name)?;
                    ops::conv2d(x, f, *padding).map_err(fail)?.into_dyn()
                }
                Op::Add => ops::broadcast_binary(arg(0)?.view(), arg(1)?.view(), |a, b| a + b).map_err(fail)?,
                Op::Sub => ops::broadcast_binary(arg(0)?.view(), arg(1)?.view(), |a, b| a - b).map_err(fail)?,
                Op::Mul => ops::broadcast_binary(arg(0)?.view(), arg(1)?.view(), |a, b| a * b).map_err(fail)?,
                Op::Maximum => ops::broadcast_binary(arg(0)?.view(), arg(1)?.view(), f32::max).map_err(fail)?,
                Op::Minimum => ops::broadcast_binary(arg(0)?.view(), arg(1)?.view(), f32::min).map_err(fail)?,
                Op::Tanh => arg(0)?.mapv(f32::tanh),
                Op::Relu => arg(0)?.mapv(|v| v.max(0.0)),
                Op::Sigmoid => arg(0)?.mapv(ops::sigmoid),
                Op::DepthToSpace(block) => {
                    ops::depth_to_space(as4(arg(0)?, &node.name)?, *block).map_err(fail)?.into_dyn()
                }
                Op::Transpose => ops::transpose(arg(0)?.view(), &index_values(arg(1)?)).map_err(fail)?,
                Op::Reshape => ops::reshape(arg(0)?.view(), &index_values(arg(1)?)).map_err(fail)?,
            };
            debug_assert_eq!(values.len(), i);
            values.push(Some(value));
        }

        values[self.output]
            .take()
            .ok_or_else(|| SuperResError::InvalidGraph("output was not produced".into()))
    }
}

fn input_value<'a>(
    values: &'a [Option<ArrayD<f32>>],
    node: &Node,
    k: usize,
) -> Result<&'a ArrayD<f32>, SuperResError> {
    values[node.inputs[k]].as_ref().ok_or_else(|| {
        SuperResError::InvalidGraph(format!("input of '{}' was not evaluated", node.name))
    })
}

/// Integer operands (`perm`, `shape`) are stored as f32 like every constant.
fn index_values(value: &ArrayD<f32>) -> Vec<f32> {
    value.iter().copied().collect()
}

fn as4<'a>(
    value: &'a ArrayD<f32>,
    node: &str,
) -> Result<ndarray::ArrayView4<'a, f32>, SuperResError> {
    value
        .view()
        .into_dimensionality::<Ix4>()
        .map_err(|_| SuperResError::Shape(format!("{node}: expected rank 4, got {:?}", value.shape())))
}

/// `"conv1/BiasAdd:0"` → `"conv1/BiasAdd"`; other output ports are unsupported.
fn input_name(raw: &str) -> Option<&str> {
    match raw.rsplit_once(':') {
        Some((name, "0")) => Some(name),
        Some((_, port)) if port.chars().all(|c| c.is_ascii_digit()) => None,
        _ => Some(raw),
    }
}

/// Depth-first post-order from `output`, rejecting cycles.
fn topo_order(
    def: &GraphDef,
    data_inputs: &[Vec<usize>],
    output: usize,
) -> Result<Vec<usize>, SuperResError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Open,
        Done,
    }

    let mut marks = vec![Mark::New; def.node.len()];
    let mut order = Vec::new();
    // (node, next input to visit)
    let mut stack = vec![(output, 0usize)];
    marks[output] = Mark::Open;

    while let Some((node, next)) = stack.pop() {
        if let Some(&child) = data_inputs[node].get(next) {
            stack.push((node, next + 1));
            match marks[child] {
                Mark::New => {
                    marks[child] = Mark::Open;
                    stack.push((child, 0));
                }
                Mark::Open => {
                    return Err(SuperResError::InvalidGraph(format!(
                        "cycle through node '{}'",
                        def.node[child].name
                    )))
                }
                Mark::Done => {}
            }
        } else {
            marks[node] = Mark::Done;
            order.push(node);
        }
    }

    Ok(order)
}

fn compile_op(node: &NodeDef) -> Result<Op, SuperResError> {
    let op = match node.op.as_str() {
        "Placeholder" => Op::Placeholder,
        "Const" => Op::Const(const_tensor(node)?),
        "Identity" => Op::Identity,
        "Conv2D" => {
            if ints_attr(node, "strides").is_some_and(|s| s.iter().any(|&v| v != 1)) {
                return Err(unsupported_attr(node, "strides other than 1"));
            }
            if ints_attr(node, "dilations").is_some_and(|s| s.iter().any(|&v| v != 1)) {
                return Err(unsupported_attr(node, "dilations other than 1"));
            }
            if string_attr(node, "data_format").is_some_and(|f| f != "NHWC") {
                return Err(unsupported_attr(node, "data_format other than NHWC"));
            }
            let padding = string_attr(node, "padding")
                .and_then(Padding::parse)
                .ok_or_else(|| unsupported_attr(node, "padding must be SAME or VALID"))?;
            Op::Conv2D(padding)
        }
        "BiasAdd" => {
            if string_attr(node, "data_format").is_some_and(|f| f != "NHWC") {
                return Err(unsupported_attr(node, "data_format other than NHWC"));
            }
            Op::Add
        }
        "Add" | "AddV2" => Op::Add,
        "Sub" => Op::Sub,
        "Mul" => Op::Mul,
        "Maximum" => Op::Maximum,
        "Minimum" => Op::Minimum,
        "Tanh" => Op::Tanh,
        "Relu" => Op::Relu,
        "Sigmoid" => Op::Sigmoid,
        "DepthToSpace" => {
            let block = int_attr(node, "block_size")
                .filter(|&b| b > 0)
                .ok_or_else(|| unsupported_attr(node, "block_size must be positive"))?;
            Op::DepthToSpace(block as usize)
        }
        "Transpose" => Op::Transpose,
        "Reshape" => Op::Reshape,
        other => {
            return Err(SuperResError::UnsupportedOp {
                node: node.name.clone(),
                op: other.to_string(),
            })
        }
    };
    Ok(op)
}

fn const_tensor(node: &NodeDef) -> Result<ArrayD<f32>, SuperResError> {
    let tensor = match node.attr.get("value").and_then(|a| a.value.as_ref()) {
        Some(Value::Tensor(t)) => t,
        _ => return Err(unsupported_attr(node, "Const without tensor value")),
    };
    tensor_to_array(tensor).map_err(|msg| SuperResError::InvalidGraph(format!("{}: {}", node.name, msg)))
}

fn tensor_to_array(tensor: &TensorProto) -> Result<ArrayD<f32>, String> {
    let shape: Vec<usize> = tensor
        .tensor_shape
        .as_ref()
        .map(|s| {
            s.dim
                .iter()
                .map(|d| usize::try_from(d.size))
                .collect::<Result<Vec<usize>, _>>()
        })
        .transpose()
        .map_err(|_| "negative dimension in constant".to_string())?
        .unwrap_or_default();
    let len: usize = shape.iter().product();

    let values: Vec<f32> = match tensor.dtype {
        DT_FLOAT if !tensor.tensor_content.is_empty() => tensor
            .tensor_content
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        DT_FLOAT => splat(&tensor.float_val, len),
        DT_INT32 if !tensor.tensor_content.is_empty() => tensor
            .tensor_content
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32)
            .collect(),
        DT_INT32 => splat(&tensor.int_val, len).into_iter().map(|v| v as f32).collect(),
        other => return Err(format!("unsupported dtype {other}")),
    };

    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| e.to_string())
}

/// A single `*_val` entry fills the whole tensor; none means zeros.
fn splat<T: Copy + Default>(values: &[T], len: usize) -> Vec<T> {
    match values {
        [] => vec![T::default(); len],
        [v] => vec![*v; len],
        many => many.to_vec(),
    }
}

fn int_attr(node: &NodeDef, key: &str) -> Option<i64> {
    match node.attr.get(key)?.value.as_ref()? {
        Value::I(v) => Some(*v),
        _ => None,
    }
}

fn ints_attr<'a>(node: &'a NodeDef, key: &str) -> Option<&'a [i64]> {
    match node.attr.get(key)?.value.as_ref()? {
        Value::List(list) => Some(&list.i),
        _ => None,
    }
}

fn string_attr<'a>(node: &'a NodeDef, key: &str) -> Option<&'a str> {
    match node.attr.get(key)?.value.as_ref()? {
        Value::S(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}

fn unsupported_attr(node: &NodeDef, what: &str) -> SuperResError {
    SuperResError::InvalidGraph(format!("{} ({}): {}", node.name, node.op, what))
}
