use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mcp_link::core::models::JsonRpcRequest;
use mcp_link::mcp::McpCodec;
use mcp_link::mcp::McpServer;
use mcp_link::registry::{EchoTool, StaticToolRegistry};
use serde_json::json;
use std::sync::Arc;
use tokio_util::codec::Decoder;

fn bench_codec_decode(c: &mut Criterion) {
    let mut codec = McpCodec::new();
    let data = b"{\"jsonrpc\":\"2.0\",\"method\":\"tools/list\",\"id\":1}\n";

    c.bench_function("codec_decode_tools_list", |b| {
        b.iter(|| {
            let mut src = BytesMut::from(&data[..]);
            let _ = codec.decode(black_box(&mut src));
        })
    });

    let mut batch = Vec::new();
    for i in 0..64 {
        let request = JsonRpcRequest::new(
            i as u64,
            "tools/call",
            Some(json!({"name": "echo", "arguments": {"text": format!("payload {}", i)}})),
        );
        batch.extend_from_slice(&serde_json::to_vec(&request).unwrap());
    }

    c.bench_function("codec_decode_64_unframed", |b| {
        b.iter(|| {
            let mut src = BytesMut::from(&batch[..]);
            while let Ok(Some(v)) = codec.decode(black_box(&mut src)) {
                black_box(v);
            }
        })
    });
}

fn bench_codec_decode_chunked(c: &mut Criterion) {
    let request = JsonRpcRequest::new(
        1u64,
        "tools/call",
        Some(json!({"name": "echo", "arguments": {"text": "x".repeat(1 << 20)}})),
    );
    let wire = serde_json::to_vec(&request).unwrap();

    c.bench_function("codec_decode_1mib_in_4k_chunks", |b| {
        b.iter(|| {
            let mut codec = McpCodec::new();
            let mut src = BytesMut::with_capacity(wire.len());
            for chunk in wire.chunks(4096) {
                src.extend_from_slice(chunk);
                if let Ok(Some(v)) = codec.decode(black_box(&mut src)) {
                    black_box(v);
                }
            }
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let tools = StaticToolRegistry::new().with_tool(EchoTool::default());
    let server = McpServer::new("bench", "0.0.0", Arc::new(tools));
    let request = JsonRpcRequest::new(
        1u64,
        "tools/call",
        Some(json!({"name": "echo", "arguments": {"text": "hello"}})),
    );

    c.bench_function("dispatch_tools_call", |b| {
        b.iter(|| {
            let _ = server.dispatch(black_box(request.clone()));
        })
    });
}

criterion_group!(
    benches,
    bench_codec_decode,
    bench_codec_decode_chunked,
    bench_dispatch
);
criterion_main!(benches);
