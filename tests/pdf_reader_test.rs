// Phase 2: lopdfベースの読み出しテスト（ページ寸法・画像列挙）

use lopdf::{Document, Object, Stream, dictionary};

use pdf_compress::error::PdfCompressError;
use pdf_compress::pdf::reader::PdfReader;
use pdf_compress::pipeline::capability::PageGeometry;

/// ページ辞書または親Pagesノードに MediaBox を置いた1ページPDFを作る。
fn build_pdf(media_box: Option<Vec<Object>>, inherited: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let contents_id = doc.add_object(Stream::new(dictionary! {}, vec![]));

    let mut page = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => contents_id,
    };
    let mut pages = dictionary! {
        "Count" => 1,
        "Type" => "Pages",
    };
    if let Some(media_box) = media_box {
        if inherited {
            pages.set("MediaBox", media_box);
        } else {
            page.set("MediaBox", media_box);
        }
    }
    let page_id = doc.add_object(page);
    pages.set("Kids", vec![Object::from(page_id)]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save test PDF");
    buf
}

fn ints(values: [i64; 4]) -> Vec<Object> {
    values.into_iter().map(Object::Integer).collect()
}

#[test]
fn test_page_dimensions_real_values() {
    let media_box = vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(595.276),
        Object::Real(841.89),
    ];
    let reader = PdfReader::open_mem(&build_pdf(Some(media_box), false)).expect("open");
    let geometry = reader.page_dimensions(1).expect("dimensions");

    assert!((geometry.width - 595.276).abs() < 0.01);
    assert!((geometry.height - 841.89).abs() < 0.01);
}

#[test]
fn test_page_dimensions_offset_origin() {
    let reader =
        PdfReader::open_mem(&build_pdf(Some(ints([10, 20, 605, 812])), false)).expect("open");
    assert_eq!(
        reader.page_dimensions(1).expect("dimensions"),
        PageGeometry::new(595.0, 792.0)
    );
}

#[test]
fn test_page_dimensions_reversed_corners() {
    let reader =
        PdfReader::open_mem(&build_pdf(Some(ints([612, 792, 0, 0])), false)).expect("open");
    assert_eq!(
        reader.page_dimensions(1).expect("dimensions"),
        PageGeometry::new(612.0, 792.0)
    );
}

#[test]
fn test_page_dimensions_inherited_from_parent() {
    let reader =
        PdfReader::open_mem(&build_pdf(Some(ints([0, 0, 612, 792])), true)).expect("open");
    assert_eq!(
        reader.page_geometries().expect("geometries"),
        vec![PageGeometry::new(612.0, 792.0)]
    );
}

#[test]
fn test_page_dimensions_zero_width_rejected() {
    let reader =
        PdfReader::open_mem(&build_pdf(Some(ints([0, 0, 0, 792])), false)).expect("open");
    let err = reader.page_dimensions(1).expect_err("zero width must fail");
    assert!(err.to_string().contains("non-positive"), "got: {err}");
}

#[test]
fn test_page_dimensions_missing_media_box() {
    let reader = PdfReader::open_mem(&build_pdf(None, false)).expect("open");
    let err = reader.page_dimensions(1).expect_err("missing MediaBox must fail");
    assert!(err.to_string().contains("MediaBox not found"), "got: {err}");
}

#[test]
fn test_page_dimensions_short_media_box() {
    let media_box = vec![Object::Integer(0), Object::Integer(0), Object::Integer(612)];
    let reader = PdfReader::open_mem(&build_pdf(Some(media_box), false)).expect("open");
    assert!(reader.page_dimensions(1).is_err());
}

#[test]
fn test_page_out_of_range() {
    let reader =
        PdfReader::open_mem(&build_pdf(Some(ints([0, 0, 612, 792])), false)).expect("open");
    assert!(reader.page_dimensions(2).is_err());
    assert!(reader.page_images(0).is_err());
}

#[test]
fn test_open_missing_file_is_unreadable() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let result = PdfReader::open(dir.path().join("missing.pdf"));
    assert!(
        matches!(result, Err(PdfCompressError::SourceUnreadable(_))),
        "expected SourceUnreadable"
    );
}

#[test]
fn test_open_garbage_is_unreadable() {
    let result = PdfReader::open_mem(b"this is not a pdf");
    assert!(matches!(result, Err(PdfCompressError::SourceUnreadable(_))));
}

#[test]
fn test_page_images_lists_image_xobjects_only() {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![0x80],
    ));
    let form_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => ints([0, 0, 1, 1]),
        },
        vec![],
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => ints([0, 0, 612, 792]),
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im1" => image_id,
                "Fm0" => form_id,
            },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save");
    let reader = PdfReader::open_mem(&buf).expect("open");

    let images = reader.page_images(1).expect("page images");
    let names: Vec<&str> = images.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["Im1"]);
}
