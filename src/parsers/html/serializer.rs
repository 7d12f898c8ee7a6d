use encoding_rs::Encoding;
use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{Handle, SerializableHandle};

use crate::error::{WorkTimeError, WorkTimeResult};

/// 序列化文档
///
/// `document_encoding` 非空且可识别时把输出重新编码为该字符集。
pub fn serialize_document(document: &Handle, document_encoding: &str) -> WorkTimeResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = document.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())
        .map_err(|e| WorkTimeError::SerializationError(format!("无法序列化DOM: {}", e)))?;

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            let s: &str = &String::from_utf8_lossy(&buf);
            let (data, _, _) = encoding.encode(s);
            buf = data.to_vec();
        }
    }

    Ok(buf)
}
