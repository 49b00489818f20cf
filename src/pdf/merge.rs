// Phase 7: 複数PDFのページ単位連結

use std::path::{Path, PathBuf};

use lopdf::{Document, Object, ObjectId};

use crate::error::PdfCompressError;
use crate::pdf::reader::PdfReader;

/// ページ辞書が親から継承しうる属性。
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// 複数のPDFファイルを順に連結して `output` に書き出す。
///
/// 戻り値は出力のページ数。
pub fn merge_files(inputs: &[PathBuf], output: &Path) -> crate::error::Result<usize> {
    let mut documents = Vec::with_capacity(inputs.len());
    for (i, path) in inputs.iter().enumerate() {
        let reader = PdfReader::open(path).map_err(|e| {
            PdfCompressError::merge(format!("input {} ({}): {e}", i, path.display()))
        })?;
        documents.push(reader.into_document());
    }

    let mut merged = merge_documents(documents)?;
    let pages = merged.get_pages().len();
    let bytes = crate::pdf::writer::save_to_bytes(&mut merged)?;
    crate::pdf::writer::write_output(output, &bytes)?;
    Ok(pages)
}

/// 読み込み済みの文書を連結する。
///
/// 1. 先頭文書を土台にする
/// 2. 以降の文書はオブジェクト番号を土台の max_id より後ろへずらして取り込む
/// 3. 全ページを土台のPagesノード直下に付け替える
/// 4. 孤立した旧ページツリーを除去して圧縮する
pub fn merge_documents(documents: Vec<Document>) -> crate::error::Result<Document> {
    if documents.len() < 2 {
        return Err(PdfCompressError::merge(
            "At least 2 PDF files required for merging",
        ));
    }

    let mut iter = documents.into_iter();
    let Some(mut dest) = iter.next() else {
        return Err(PdfCompressError::merge("No documents to merge"));
    };
    let mut dest_max_id = dest.max_id;
    let mut page_refs = collect_pages(&mut dest);

    for mut source in iter {
        let source_pages = collect_pages(&mut source);
        let id_offset = dest_max_id;

        for (old_id, object) in std::mem::take(&mut source.objects) {
            let new_id = (old_id.0 + id_offset, old_id.1);
            dest.objects.insert(new_id, remap_object_refs(object, id_offset));
        }

        page_refs.extend(
            source_pages
                .into_iter()
                .map(|(num, generation)| (num + id_offset, generation)),
        );

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &page_refs)?;
    crate::pdf::optimizer::optimize(&mut dest);

    Ok(dest)
}

/// ページIDを文書順に集め、継承属性をページ辞書へ降ろしておく。
fn collect_pages(doc: &mut Document) -> Vec<ObjectId> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for &page_id in &page_ids {
        inherit_page_attributes(doc, page_id);
    }
    page_ids
}

/// 親ノードにしかない継承属性をページ辞書にコピーする。
///
/// 付け替え後は元の親をたどれなくなるため。
fn inherit_page_attributes(doc: &mut Document, page_id: ObjectId) {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();

    {
        let Ok(page) = doc.get_dictionary(page_id) else {
            return;
        };
        for key in INHERITABLE_KEYS {
            if page.has(key) {
                continue;
            }
            let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
            // 循環したページツリーでも止まるよう深さを制限する
            let mut depth = 0;
            while let Some(parent_id) = parent
                && depth < 32
            {
                let Ok(node) = doc.get_dictionary(parent_id) else {
                    break;
                };
                if let Ok(value) = node.get(key) {
                    inherited.push((key, value.clone()));
                    break;
                }
                parent = node.get(b"Parent").and_then(Object::as_reference).ok();
                depth += 1;
            }
        }
    }

    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            remap_dict(&mut dict, offset);
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            remap_dict(&mut stream.dict, offset);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn remap_dict(dict: &mut lopdf::Dictionary, offset: u32) {
    for (_, value) in dict.iter_mut() {
        *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
    }
}

/// 土台のPagesノードのKids/Countを差し替え、全ページのParentを付け替える。
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> crate::error::Result<()> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfCompressError::merge("No Root in trailer"))?;

    let pages_id = doc
        .get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfCompressError::merge("No Pages in catalog"))?;

    let pages_dict = doc
        .get_dictionary_mut(pages_id)
        .map_err(|_| PdfCompressError::merge("Invalid pages dictionary"))?;
    pages_dict.set(
        "Kids",
        page_refs
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>(),
    );
    pages_dict.set("Count", page_refs.len() as i64);
    // 土台のPagesノードがルートになる
    pages_dict.remove(b"Parent");
    // 継承属性は各ページへ降ろし済み。他文書のページに継承させない
    for key in INHERITABLE_KEYS {
        pages_dict.remove(key);
    }

    for (index, &page_id) in page_refs.iter().enumerate() {
        let page = doc.get_dictionary_mut(page_id).map_err(|_| {
            PdfCompressError::merge(format!(
                "page {} ({} {} R) is not a dictionary",
                index + 1,
                page_id.0,
                page_id.1
            ))
        })?;
        page.set("Parent", pages_id);
    }

    Ok(())
}
