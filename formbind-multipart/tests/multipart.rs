use std::io::Read;

use formbind::Bind;
use formbind_decode::{DecodeError, FieldError, MultiError};
use formbind_multipart::{FileHeader, MultipartDecoder, MultipartForm};
use http::{HeaderMap, HeaderValue};
use http::header::CONTENT_TYPE;

#[derive(Debug, Default, Bind)]
pub struct Attachment {
    pub label: String,
    pub file: FileHeader,
}

#[derive(Debug, Default, Bind)]
pub struct Submission {
    pub title: String,
    pub count: u32,
    pub avatar: FileHeader,
    pub cover: Option<Box<FileHeader>>,
    pub gallery: Vec<FileHeader>,
    pub attachments: Vec<Attachment>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Bind)]
pub struct Application {
    #[form(required)]
    pub name: String,
    #[form(required)]
    pub resume: Option<FileHeader>,
}

fn read_all(file: &FileHeader) -> String {
    let mut text = String::new();
    file.open().unwrap().read_to_string(&mut text).unwrap();
    text
}

fn field_errors(err: DecodeError) -> MultiError {
    err.into_fields().expect("per-field errors")
}

#[test]
fn text_and_files_together() {
    formbind_testhelpers::setup();

    let mut form = MultipartForm::new();
    form.add_value("title", "Trip");
    form.add_value("count", "3");
    form.add_file("avatar", "me.png", "png")
        .unwrap()
        .header
        .insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
    form.add_file("cover", "cover.jpg", "jpg").unwrap();
    form.add_file("attachments.1.file", "notes.txt", "notes").unwrap();
    form.add_value("attachments.1.label", "Notes");

    let mut submission = Submission::default();
    MultipartDecoder::new()
        .decode(&mut submission, &form)
        .unwrap();

    assert_eq!(submission.title, "Trip");
    assert_eq!(submission.count, 3);
    assert_eq!(submission.avatar.filename, "me.png");
    assert_eq!(submission.avatar.content_type(), Some("image/png"));
    assert_eq!(submission.avatar.size, 3);
    assert_eq!(submission.cover.as_ref().unwrap().filename, "cover.jpg");
    assert_eq!(submission.attachments.len(), 2);
    assert_eq!(submission.attachments[1].label, "Notes");
    assert_eq!(read_all(&submission.attachments[1].file), "notes");
    assert!(submission.gallery.is_empty());
}

#[test]
fn last_upload_wins_for_single_fields() {
    let mut form = MultipartForm::new();
    form.add_file("avatar", "first.png", "1").unwrap();
    form.add_file("avatar", "second.png", "2").unwrap();

    let mut submission = Submission::default();
    MultipartDecoder::new()
        .decode(&mut submission, &form)
        .unwrap();
    assert_eq!(submission.avatar.filename, "second.png");
    assert_eq!(read_all(&submission.avatar), "2");
}

#[test]
fn lists_keep_every_upload_in_order() {
    let mut form = MultipartForm::new();
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        form.add_file("gallery", name, name.as_bytes().to_vec()).unwrap();
    }

    let mut submission = Submission {
        gallery: vec![FileHeader::in_memory("old.jpg", "old")],
        ..Default::default()
    };
    MultipartDecoder::new()
        .decode(&mut submission, &form)
        .unwrap();

    let names: Vec<_> = submission.gallery.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, ["a.jpg", "b.jpg", "c.jpg"]);
    assert_eq!(form.files("gallery").len(), 3);
    assert!(form.files("missing").is_empty());
}

#[test]
fn inserted_files_keep_their_headers() {
    let mut header = HeaderMap::new();
    header.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));

    let mut form = MultipartForm::new();
    form.insert_file(
        "cover",
        FileHeader::in_memory("cv.pdf", "%PDF").with_header(header),
    );

    let mut submission = Submission::default();
    MultipartDecoder::new()
        .decode(&mut submission, &form)
        .unwrap();

    let cover = submission.cover.expect("cover uploaded");
    assert_eq!(cover.filename, "cv.pdf");
    assert_eq!(cover.content_type(), Some("application/pdf"));
    assert!(FileHeader::in_memory("a", "b").content_type().is_none());
}

#[test]
fn content_over_budget_goes_to_disk() {
    formbind_testhelpers::setup();

    let mut form = MultipartForm::with_max_memory(4);
    form.add_file("avatar", "small", "tiny").unwrap();
    form.add_file("gallery", "large", vec![b'x'; 64]).unwrap();
    assert_eq!(form.memory_used(), 4);
    assert!(form.files("avatar")[0].is_in_memory());
    assert!(!form.files("gallery")[0].is_in_memory());

    let mut submission = Submission::default();
    MultipartDecoder::new()
        .decode(&mut submission, &form)
        .unwrap();

    let large = &submission.gallery[0];
    assert_eq!(large.size, 64);
    assert_eq!(large.bytes().unwrap().len(), 64);

    // Each reader starts from the beginning
    assert_eq!(read_all(large), "x".repeat(64));
    assert_eq!(read_all(large), "x".repeat(64));
    assert_eq!(read_all(&submission.avatar), "tiny");
}

#[test]
fn errors_from_both_halves_are_merged() {
    formbind_testhelpers::setup();

    let mut form = MultipartForm::new();
    form.add_value("count", "many");
    form.add_value("title", "kept");
    form.add_file("bogus", "x.bin", "x").unwrap();
    form.add_file("tags", "tags.txt", "a,b").unwrap();
    form.add_file("title", "title.txt", "t").unwrap();

    let mut submission = Submission {
        tags: vec!["keep".to_string()],
        ..Default::default()
    };
    let errors = field_errors(
        MultipartDecoder::new()
            .decode(&mut submission, &form)
            .unwrap_err(),
    );

    assert_eq!(
        errors.keys().collect::<Vec<_>>(),
        ["bogus", "count", "tags", "title"]
    );
    assert!(matches!(errors.get("bogus"), Some(FieldError::UnknownField(_))));
    assert!(matches!(errors.get("count"), Some(FieldError::Conversion(_))));
    insta::assert_snapshot!(errors.get("title").unwrap(), @r#"cannot assign a file to "title" of type String"#);
    assert_eq!(submission.title, "kept");
    assert_eq!(submission.tags, ["keep"]);
}

#[test]
fn unknown_keys_follow_the_decoder_setting() {
    let mut form = MultipartForm::new();
    form.add_value("nope", "1");
    form.add_file("bogus", "x.bin", "x").unwrap();
    form.add_file("avatar", "a.png", "a").unwrap();

    let mut decoder = MultipartDecoder::new();
    decoder.ignore_unknown_keys(true);

    let mut submission = Submission::default();
    decoder.decode(&mut submission, &form).unwrap();
    assert_eq!(submission.avatar.filename, "a.png");
}

#[test]
fn non_struct_targets_stop_before_files() {
    let mut form = MultipartForm::new();
    form.add_file("0", "a.png", "a").unwrap();

    let mut files: Vec<FileHeader> = Vec::new();
    let err = MultipartDecoder::new().decode(&mut files, &form).unwrap_err();
    assert!(matches!(err, DecodeError::NotAStruct { .. }));
    assert!(files.is_empty());
}

#[test]
fn uploads_satisfy_required_fields() {
    let decoder = MultipartDecoder::new();

    let mut form = MultipartForm::new();
    form.add_value("name", "Ann");
    let errors = field_errors(
        decoder
            .decode(&mut Application::default(), &form)
            .unwrap_err(),
    );
    assert!(matches!(
        errors.get("resume"),
        Some(FieldError::MissingRequired { .. })
    ));

    form.add_file("resume", "cv.pdf", "%PDF").unwrap();
    let mut application = Application::default();
    decoder.decode(&mut application, &form).unwrap();
    assert_eq!(application.resume.unwrap().filename, "cv.pdf");
}
