//! JSON Pointer ベースの部分パッチ適用
//!
//! InMemoryContainer が使います。配列インデックスは扱いません
//! （注文ドキュメントの status / shipment はオブジェクトのフィールドなので不要）。

use serde_json::{Map, Value};

use crate::ports::{DocumentError, PatchOperation};

/// パッチ操作をまとめて適用
///
/// 途中で失敗した場合、`doc` は一切変更されません。
pub fn apply_patch(doc: &mut Value, operations: &[PatchOperation]) -> Result<(), DocumentError> {
    let mut working = doc.clone();
    for op in operations {
        apply_one(&mut working, op)?;
    }
    *doc = working;
    Ok(())
}

fn apply_one(doc: &mut Value, op: &PatchOperation) -> Result<(), DocumentError> {
    let path = op.path();
    let (parents, key) = split_pointer(path)?;
    let parent = parent_mut(doc, &parents, path)?;

    match op {
        PatchOperation::Set { value, .. } => {
            parent.insert(key, value.clone());
        }
        PatchOperation::Replace { value, .. } => {
            let slot = parent
                .get_mut(&key)
                .ok_or_else(|| DocumentError::InvalidPatch(format!("{path} does not exist")))?;
            *slot = value.clone();
        }
        PatchOperation::Remove { .. } => {
            parent
                .remove(&key)
                .ok_or_else(|| DocumentError::InvalidPatch(format!("{path} does not exist")))?;
        }
    }
    Ok(())
}

/// `/a/b/c` → (["a", "b"], "c")
fn split_pointer(path: &str) -> Result<(Vec<String>, String), DocumentError> {
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| DocumentError::InvalidPatch(format!("path must start with '/': {path}")))?;

    let mut tokens: Vec<String> = rest.split('/').map(unescape_token).collect();
    let key = tokens
        .pop()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| DocumentError::InvalidPatch(format!("empty field name in {path}")))?;
    Ok((tokens, key))
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn parent_mut<'a>(
    doc: &'a mut Value,
    parents: &[String],
    path: &str,
) -> Result<&'a mut Map<String, Value>, DocumentError> {
    let mut current = doc;
    for token in parents {
        current = current
            .get_mut(token.as_str())
            .ok_or_else(|| DocumentError::InvalidPatch(format!("parent of {path} does not exist")))?;
    }
    current
        .as_object_mut()
        .ok_or_else(|| DocumentError::InvalidPatch(format!("parent of {path} is not an object")))
}
