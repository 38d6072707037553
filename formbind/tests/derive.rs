use std::any::Any;

use formbind::{Bind, Def, Field, FieldFlags, Shape};

/// A person
#[derive(Debug, Default, PartialEq, Bind)]
pub struct Person {
    /// Full name
    #[form(rename = "name", required)]
    pub name: String,
    pub email: String,
}

#[derive(Debug, Default, PartialEq, Bind)]
pub struct Post {
    #[form(rename = "title")]
    pub title: String,
    pub content: String,
}

#[allow(dead_code)]
struct NotBindable;

#[derive(Default, Bind)]
pub struct BlogPost {
    #[form(flatten)]
    pub post: Post,
    #[form(rename = "id")]
    pub id: i32,
    #[form(rename = "-")]
    pub ignored: String,
    #[form(skip)]
    #[allow(dead_code)]
    cache: Option<Box<NotBindableHolder>>,
    #[form(rename = "rating")]
    pub ratings: Vec<i32>,
    pub author: Person,
    pub coauthor: Option<Box<Person>>,
    pub readers: Vec<Person>,
    pub contributors: Vec<Option<Box<Person>>>,
    pub(crate) pair: Vec<Option<u8>>,
    #[allow(dead_code)]
    unexported: String,
    pub r#type: String,
}

#[derive(Default)]
#[allow(dead_code)]
struct NotBindableHolder(Option<NotBindable>);

fn fields(shape: &'static Shape) -> &'static [Field] {
    shape.as_struct().expect("struct shape").fields
}

fn field(shape: &'static Shape, name: &str) -> &'static Field {
    fields(shape)
        .iter()
        .find(|field| field.name == name)
        .unwrap_or_else(|| panic!("no field {name}"))
}

#[test]
fn fields_keep_declaration_order() {
    let names: Vec<_> = fields(BlogPost::SHAPE).iter().map(|f| f.name).collect();
    assert_eq!(
        names,
        [
            "post",
            "id",
            "ignored",
            "cache",
            "ratings",
            "author",
            "coauthor",
            "readers",
            "contributors",
            "pair",
            "unexported",
            "type",
        ]
    );
    assert_eq!(BlogPost::SHAPE.type_identifier, "BlogPost");
}

#[test]
fn rename_sets_the_external_key() {
    let ratings = field(BlogPost::SHAPE, "ratings");
    assert_eq!(ratings.rename, Some("rating"));
    assert_eq!(ratings.effective_name(), "rating");
    assert_eq!(field(BlogPost::SHAPE, "author").effective_name(), "author");
    assert_eq!(field(BlogPost::SHAPE, "type").effective_name(), "type");
}

#[test]
fn flags_follow_attributes_and_visibility() {
    assert_eq!(field(BlogPost::SHAPE, "post").flags, FieldFlags::FLATTEN);
    assert_eq!(field(BlogPost::SHAPE, "ignored").flags, FieldFlags::SKIP);
    assert_eq!(
        field(BlogPost::SHAPE, "cache").flags,
        FieldFlags::SKIP | FieldFlags::PRIVATE
    );
    assert_eq!(field(BlogPost::SHAPE, "unexported").flags, FieldFlags::PRIVATE);
    assert_eq!(field(BlogPost::SHAPE, "pair").flags, FieldFlags::empty());
    assert!(field(Person::SHAPE, "name").is_required());
    assert!(!field(BlogPost::SHAPE, "unexported").is_bindable());
    assert!(field(BlogPost::SHAPE, "id").is_bindable());
}

#[test]
fn field_shapes_describe_declared_types() {
    assert_eq!(field(BlogPost::SHAPE, "id").shape(), i32::SHAPE);
    assert_eq!(
        field(BlogPost::SHAPE, "contributors").shape().to_string(),
        "Vec<Option<Box<Person>>>"
    );
    assert!(matches!(field(BlogPost::SHAPE, "readers").shape().def, Def::List(_)));
    assert!(field(BlogPost::SHAPE, "post").shape().is_struct());
}

#[test]
fn get_mut_reaches_into_live_values() {
    let mut post = BlogPost::default();
    let id = field(BlogPost::SHAPE, "id");
    let slot = (id.get_mut)(&mut post).expect("id is reachable");
    *slot.downcast_mut::<i32>().expect("i32 slot") = 42;
    assert_eq!(post.id, 42);

    let title = field(Post::SHAPE, "title");
    let flattened = (field(BlogPost::SHAPE, "post").get_mut)(&mut post).unwrap();
    let slot = (title.get_mut)(flattened).unwrap();
    *slot.downcast_mut::<String>().unwrap() = "Hello".to_string();
    assert_eq!(post.post.title, "Hello");
}

#[test]
fn get_mut_rejects_other_types() {
    let mut person = Person::default();
    let id = field(BlogPost::SHAPE, "id");
    assert!((id.get_mut)(&mut person as &mut dyn Any).is_none());
    assert!((field(BlogPost::SHAPE, "cache").get_mut)(&mut BlogPost::default()).is_none());
}

#[test]
fn doc_comments_are_collected() {
    assert_eq!(Person::SHAPE.doc, [" A person"]);
    assert_eq!(field(Person::SHAPE, "name").doc, [" Full name"]);
    assert!(field(Person::SHAPE, "email").doc.is_empty());
}

#[test]
fn shape_display() {
    insta::assert_snapshot!(BlogPost::SHAPE, @"BlogPost");
    insta::assert_snapshot!(field(BlogPost::SHAPE, "coauthor").shape(), @"Option<Box<Person>>");
}

#[test]
fn shape_of_matches_the_declared_type() {
    let post = BlogPost::default();
    assert_eq!(formbind::shape_of(&post), BlogPost::SHAPE);
    assert_eq!(formbind::shape_of(&post.readers), <Vec<Person>>::SHAPE);
    assert_eq!(formbind::shape_of(&post.post.title), String::SHAPE);
}
