//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use espcn_upscaler::config::UpscalerConfig;
use espcn_upscaler::http::HttpServer;
use espcn_upscaler::lifecycle::{startup, Shutdown};
use espcn_upscaler::superres::proto::{AttrValue, GraphDef, NodeDef, TensorProto};
use image::{ImageFormat, Rgb, RgbImage};
use prost::Message;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// A frozen graph that repeats every luma sample into a `block`x`block` tile.
pub fn nearest_graph(block: i64) -> Vec<u8> {
    let depth = block * block;
    GraphDef {
        node: vec![
            NodeDef::new("input", "Placeholder", &[]),
            NodeDef::new("weights", "Const", &[]).with_attr(
                "value",
                AttrValue::tensor(TensorProto::float(
                    &[1, 1, 1, depth],
                    &vec![1.0; depth as usize],
                )),
            ),
            NodeDef::new("conv", "Conv2D", &["input", "weights"])
                .with_attr("padding", AttrValue::string("SAME"))
                .with_attr("strides", AttrValue::int_list(&[1, 1, 1, 1])),
            NodeDef::new("output", "DepthToSpace", &["conv"])
                .with_attr("block_size", AttrValue::int(block)),
        ],
    }
    .encode_to_vec()
}

/// Bias of the last layer in [`espcn_graph`].
pub const ESPCN_OUT_BIAS: f32 = 0.05;

fn conv_layer(
    nodes: &mut Vec<NodeDef>,
    name: &str,
    input: &str,
    kernel: i64,
    c_in: i64,
    c_out: i64,
    bias: f32,
) -> String {
    // Box filter over the whole receptive field: an interior pixel of a flat
    // image keeps its value, borders see the zero padding.
    let taps = kernel * kernel * c_in;
    let weights = vec![1.0 / taps as f32; (taps * c_out) as usize];
    let w = format!("{name}/weights");
    let b = format!("{name}/biases");
    let conv = format!("{name}/Conv2D");
    let out = format!("{name}/BiasAdd");
    nodes.push(NodeDef::new(&w, "Const", &[]).with_attr(
        "value",
        AttrValue::tensor(TensorProto::float(&[kernel, kernel, c_in, c_out], &weights)),
    ));
    nodes.push(NodeDef::new(&b, "Const", &[]).with_attr(
        "value",
        AttrValue::tensor(TensorProto::float(&[c_out], &vec![bias; c_out as usize])),
    ));
    nodes.push(
        NodeDef::new(&conv, "Conv2D", &[input, w.as_str()])
            .with_attr("padding", AttrValue::string("SAME"))
            .with_attr("strides", AttrValue::int_list(&[1, 1, 1, 1]))
            .with_attr("data_format", AttrValue::string("NHWC")),
    );
    nodes.push(NodeDef::new(&out, "BiasAdd", &[conv.as_str(), b.as_str()]));
    out
}

/// The x4 ESPCN topology as exported for OpenCV: 5x5x64 → tanh → 3x3x32 →
/// tanh → 3x3x16 → DepthToSpace(4) → `NHWC_output` → `NCHW_output`.
///
/// For an interior pixel of a flat image the output luma is
/// `tanh(tanh(y)) + ESPCN_OUT_BIAS`.
pub fn espcn_graph() -> Vec<u8> {
    let mut nodes = vec![NodeDef::new("IteratorGetNext", "Placeholder", &[])];
    let l1 = conv_layer(&mut nodes, "conv1", "IteratorGetNext", 5, 1, 64, 0.0);
    nodes.push(NodeDef::new("conv1/Tanh", "Tanh", &[l1.as_str()]));
    let l2 = conv_layer(&mut nodes, "conv2", "conv1/Tanh", 3, 64, 32, 0.0);
    nodes.push(NodeDef::new("conv2/Tanh", "Tanh", &[l2.as_str()]));
    let l3 = conv_layer(&mut nodes, "conv3", "conv2/Tanh", 3, 32, 16, ESPCN_OUT_BIAS);
    nodes.push(
        NodeDef::new("DepthToSpace", "DepthToSpace", &[l3.as_str()])
            .with_attr("block_size", AttrValue::int(4)),
    );
    nodes.push(NodeDef::new("NHWC_output", "Identity", &["DepthToSpace"]));
    nodes.push(NodeDef::new("perm", "Const", &[]).with_attr(
        "value",
        AttrValue::tensor(TensorProto::int32(&[4], &[0, 3, 1, 2])),
    ));
    nodes.push(NodeDef::new("NCHW_output", "Transpose", &["NHWC_output", "perm"]));
    GraphDef { node: nodes }.encode_to_vec()
}

/// Encode a solid-colour PNG.
pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A running server plus everything that must outlive it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub dir: TempDir,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn output_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("out")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Write the nearest-neighbour x4 model to a temp dir and start the service
/// on an ephemeral port.
pub async fn spawn_server(tweak: impl FnOnce(&mut UpscalerConfig, &Path)) -> TestServer {
    spawn_server_with_model(nearest_graph(4), tweak).await
}

pub async fn spawn_server_with_model(
    model: Vec<u8>,
    tweak: impl FnOnce(&mut UpscalerConfig, &Path),
) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("ESPCN_x4.pb");
    std::fs::write(&model_path, model).unwrap();

    let mut config = UpscalerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.model.path = model_path.to_string_lossy().into_owned();
    config.output.directory = dir.path().join("out").to_string_lossy().into_owned();
    tweak(&mut config, dir.path());

    let engine = startup::load_engine(&config.model).unwrap();
    let output = startup::open_output(&config.output).await.unwrap();

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, engine, output);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        dir,
        shutdown,
    }
}
