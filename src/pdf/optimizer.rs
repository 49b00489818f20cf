// Phase 5: 確定時のコンパクション: FlateDecode圧縮、孤立オブジェクト除去、番号振り直し

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, ObjectId};

/// ドキュメント内の未圧縮ストリームにFlateDecode圧縮を適用する。
///
/// 既にフィルターが設定されているストリームはスキップする（二重圧縮防止）。
/// 圧縮後の方が大きくなる場合は元のまま残す。
pub fn compress_streams(doc: &mut Document) {
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();

    for id in ids {
        let Some(Object::Stream(stream)) = doc.objects.get_mut(&id) else {
            continue;
        };
        if stream.dict.get(b"Filter").is_ok() {
            continue;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        if encoder.write_all(&stream.content).is_err() {
            continue;
        }
        let Ok(compressed) = encoder.finish() else {
            continue;
        };
        if compressed.len() >= stream.content.len() {
            continue;
        }

        stream.dict.set("Filter", "FlateDecode");
        stream.set_content(compressed);
    }
}

/// 孤立オブジェクト（どこからも参照されていないオブジェクト）を除去する。
pub fn delete_unused_objects(doc: &mut Document) -> usize {
    doc.prune_objects().len()
}

/// オブジェクト番号を1から詰め直し、相互参照表を密にする。
pub fn renumber(doc: &mut Document) {
    doc.renumber_objects();
}

/// PDF最適化の全パスを順序通りに実行する。
///
/// 1. 孤立オブジェクトを除去
/// 2. 未圧縮ストリームを圧縮
/// 3. オブジェクト番号を振り直す
pub fn optimize(doc: &mut Document) {
    let pruned = delete_unused_objects(doc);
    compress_streams(doc);
    renumber(doc);
    tracing::debug!(pruned, objects = doc.objects.len(), "document compacted");
}
