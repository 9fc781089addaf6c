use bytes::BytesMut;
use mcp_link::core::models::{JsonRpcRequest, JsonRpcResponse, RequestId};
use mcp_link::mcp::codec::{decode_request, decode_response};
use mcp_link::mcp::McpCodec;
use proptest::prelude::*;
use serde_json::json;
use tokio_util::codec::{Decoder, Encoder};

proptest! {
    #[test]
    fn test_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut codec = McpCodec::new();
        let mut src = BytesMut::from(&bytes[..]);
        // Drain until the codec either stalls or reports an error.
        for _ in 0..bytes.len() + 1 {
            match codec.decode(&mut src) {
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break,
            }
        }
        let _ = codec.decode_eof(&mut src);
    }

    #[test]
    fn test_numeric_id_is_preserved(id in any::<u64>(), method in "[a-z]{1,8}(/[a-z]{1,8})?") {
        let mut codec = McpCodec::new();
        let mut wire = BytesMut::new();
        let req = JsonRpcRequest::new(id, method.clone(), None);
        codec.encode(&req, &mut wire).unwrap();

        let back = decode_request(codec.decode(&mut wire).unwrap().unwrap()).unwrap();
        prop_assert_eq!(back.id.clone(), Some(RequestId::from(id)));
        prop_assert_eq!(back.method, method);

        // The server echoes the id back unchanged.
        let resp = JsonRpcResponse::success(back.id, json!(null));
        codec.encode(&resp, &mut wire).unwrap();
        let echoed = decode_response(codec.decode(&mut wire).unwrap().unwrap()).unwrap();
        prop_assert_eq!(echoed.id, Some(RequestId::from(id)));
    }

    #[test]
    fn test_string_id_is_preserved(id in "\\PC{0,24}") {
        let mut codec = McpCodec::new();
        let mut wire = BytesMut::new();
        codec.encode(&JsonRpcRequest::new(id.clone(), "tools/list", None), &mut wire).unwrap();
        let back = decode_request(codec.decode(&mut wire).unwrap().unwrap()).unwrap();
        prop_assert_eq!(back.id, Some(RequestId::Str(id)));
    }

    #[test]
    fn test_any_chunking_yields_same_messages(split in 0usize..200) {
        let mut whole = BytesMut::new();
        let mut codec = McpCodec::new();
        for i in 0..3u64 {
            let req = JsonRpcRequest::new(i, "tools/list", Some(json!({"i": i})));
            codec.encode(&req, &mut whole).unwrap();
        }
        let split = split.min(whole.len());

        let mut src = BytesMut::from(&whole[..split]);
        let mut got = Vec::new();
        while let Some(v) = codec.decode(&mut src).unwrap() {
            got.push(v);
        }
        src.extend_from_slice(&whole[split..]);
        while let Some(v) = codec.decode_eof(&mut src).unwrap() {
            got.push(v);
        }
        prop_assert_eq!(got.len(), 3);
        for (i, v) in got.iter().enumerate() {
            prop_assert_eq!(&v["params"]["i"], &json!(i));
        }
    }
}
