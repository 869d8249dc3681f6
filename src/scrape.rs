use crate::structs::*;

use encoding_rs::Encoding;
use ego_tree::NodeRef;
use log::{debug, warn};
use regex::Regex;
use reqwest::{Certificate, Client};
use scraper::{ElementRef, Html, Node, Selector};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of `courseDet` cells making up one lesson row.
pub const LESSON_CELL_NUM: usize = 8;

const COURSE_INFO_CLASS: &str = "courseTD";
const LESSON_DETAIL_CLASS: &str = "courseDet";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("expected at least {expected} `{class}` cells, found {found}")]
    MissingMarkers {
        class: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("`{class}` cell {index} has no text")]
    MissingText { class: &'static str, index: usize },
    #[error("invalid selector: {0}")]
    Selector(String),
    #[error(transparent)]
    Pattern(#[from] regex::Error),
    #[error("unknown charset `{0}`")]
    UnknownCharset(String),
    #[error("no certificates in {0}")]
    NoCertificates(PathBuf),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, ScrapeError>;

pub struct Fetcher {
    client: Client,
    url: String,
    encoding: &'static Encoding,
}

impl Fetcher {
    /// Builds a client that only trusts the certificates in `cacert_path`
    /// and keeps no idle connections between requests.
    pub fn new(url: &str, cacert_path: &Path, charset: &str) -> Result<Self> {
        let pem = std::fs::read(cacert_path)?;
        let certs = Certificate::from_pem_bundle(&pem)?;
        if certs.is_empty() {
            return Err(ScrapeError::NoCertificates(cacert_path.into()));
        }

        let mut builder = Client::builder()
            .gzip(true)
            .tls_built_in_root_certs(false)
            .pool_max_idle_per_host(0);
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }

        Self::with_client(builder.build()?, url, charset)
    }

    /// Uses `client` as is. [`Fetcher::new`] is the pinned-bundle variant.
    pub fn with_client(client: Client, url: &str, charset: &str) -> Result<Self> {
        let encoding = Encoding::for_label(charset.as_bytes())
            .ok_or_else(|| ScrapeError::UnknownCharset(charset.into()))?;

        Ok(Self {
            client,
            url: url.into(),
            encoding,
        })
    }

    pub async fn course_page(&self, year: &str, course_id: &str) -> Result<String> {
        let body = self
            .client
            .post(&self.url)
            .form(&[
                ("peula", "Simple"),
                ("maslul", "0"),
                ("shana", "0"),
                ("year", year),
                ("course", course_id),
            ])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!("course {course_id}: {} bytes", body.len());
        Ok(decode_page(&body, self.encoding))
    }
}

/// Decodes with `encoding` whatever charset the server claims.
pub fn decode_page(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

#[derive(Debug, Clone, Copy)]
enum CourseField {
    Id,
    Name,
    Semester,
    Nz,
}

#[derive(Debug, Clone, Copy)]
enum Transform {
    Raw,
    Digits,
}

struct CourseCell {
    offset: usize,
    field: CourseField,
    transform: Transform,
}

const COURSE_CELLS: &[CourseCell] = &[
    CourseCell {
        offset: 2,
        field: CourseField::Id,
        transform: Transform::Digits,
    },
    CourseCell {
        offset: 1,
        field: CourseField::Name,
        transform: Transform::Raw,
    },
    CourseCell {
        offset: 6,
        field: CourseField::Nz,
        transform: Transform::Digits,
    },
    CourseCell {
        offset: 7,
        field: CourseField::Semester,
        transform: Transform::Raw,
    },
];

#[derive(Debug, Clone, Copy)]
enum LessonField {
    Hall,
    Hour,
    Day,
    Semester,
    Group,
    Type,
    Lecturer,
}

#[derive(Debug, Clone, Copy)]
enum Extract {
    /// Text of every `<b>` descendant.
    Bold,
    /// Text of every direct child that has any.
    Lines,
    /// Direct text of the cell itself.
    Scalar,
}

struct LessonCell {
    offset: usize,
    field: LessonField,
    extract: Extract,
}

// offset 1 is never read
const LESSON_CELLS: &[LessonCell] = &[
    LessonCell {
        offset: 0,
        field: LessonField::Hall,
        extract: Extract::Bold,
    },
    LessonCell {
        offset: 2,
        field: LessonField::Hour,
        extract: Extract::Lines,
    },
    LessonCell {
        offset: 3,
        field: LessonField::Day,
        extract: Extract::Lines,
    },
    LessonCell {
        offset: 4,
        field: LessonField::Semester,
        extract: Extract::Lines,
    },
    LessonCell {
        offset: 5,
        field: LessonField::Group,
        extract: Extract::Scalar,
    },
    LessonCell {
        offset: 6,
        field: LessonField::Type,
        extract: Extract::Scalar,
    },
    LessonCell {
        offset: 7,
        field: LessonField::Lecturer,
        extract: Extract::Lines,
    },
];

enum Slot<'a> {
    List(&'a mut Vec<String>),
    Scalar(&'a mut Option<String>),
}

impl LessonField {
    fn slot(self, lesson: &mut Lesson) -> Slot<'_> {
        match self {
            LessonField::Hall => Slot::List(&mut lesson.hall),
            LessonField::Hour => Slot::List(&mut lesson.hour),
            LessonField::Day => Slot::List(&mut lesson.day),
            LessonField::Semester => Slot::List(&mut lesson.semester),
            LessonField::Group => Slot::Scalar(&mut lesson.group),
            LessonField::Type => Slot::Scalar(&mut lesson.kind),
            LessonField::Lecturer => Slot::List(&mut lesson.lecturer),
        }
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(e.to_string()))
}

/// Extracts one course record from a decoded catalog page.
pub fn parse_course(page: &str, year: &str) -> Result<Course> {
    let doc = Html::parse_document(page);

    let mut course = parse_general_info(&doc, year)?;
    course.lessons = parse_lessons(&doc)?;

    Ok(course)
}

fn parse_general_info(doc: &Html, year: &str) -> Result<Course> {
    let info_sel = selector(&format!(".{COURSE_INFO_CLASS}"))?;
    let info: Vec<ElementRef> = doc.select(&info_sel).collect();
    debug!("{} `{COURSE_INFO_CLASS}` cells", info.len());

    let expected = COURSE_CELLS.iter().map(|c| c.offset + 1).max().unwrap_or(0);
    if info.len() < expected {
        return Err(ScrapeError::MissingMarkers {
            class: COURSE_INFO_CLASS,
            expected,
            found: info.len(),
        });
    }

    let non_digit = Regex::new("[^0-9]")?;
    let mut course = Course {
        id: String::new(),
        name: None,
        year: year.into(),
        semester: None,
        nz: String::new(),
        lessons: Vec::new(),
    };

    for cell in COURSE_CELLS {
        let text = direct_text(*info[cell.offset]);
        let value = match cell.transform {
            Transform::Raw => text,
            Transform::Digits => {
                let text = text.ok_or(ScrapeError::MissingText {
                    class: COURSE_INFO_CLASS,
                    index: cell.offset,
                })?;
                Some(non_digit.replace_all(&text, "").into_owned())
            }
        };
        match cell.field {
            CourseField::Id => course.id = value.unwrap_or_default(),
            CourseField::Name => course.name = value,
            CourseField::Semester => course.semester = value,
            CourseField::Nz => course.nz = value.unwrap_or_default(),
        }
    }

    Ok(course)
}

fn parse_lessons(doc: &Html) -> Result<Vec<Lesson>> {
    let det_sel = selector(&format!(".{LESSON_DETAIL_CLASS}"))?;
    let bold_sel = selector("b")?;
    let cells: Vec<ElementRef> = doc.select(&det_sel).collect();

    let rows = cells.chunks_exact(LESSON_CELL_NUM);
    let leftover = rows.remainder().len();
    if leftover > 0 {
        warn!("dropping {leftover} trailing `{LESSON_DETAIL_CLASS}` cells");
    }

    Ok(rows.map(|row| parse_lesson(row, &bold_sel)).collect())
}

fn parse_lesson(row: &[ElementRef], bold_sel: &Selector) -> Lesson {
    let mut lesson = Lesson::default();

    for cell in LESSON_CELLS {
        let td = row[cell.offset];
        let values = || match cell.extract {
            Extract::Bold => bold_texts(td, bold_sel),
            Extract::Lines => line_texts(td),
            Extract::Scalar => direct_text(*td).into_iter().collect(),
        };
        match cell.field.slot(&mut lesson) {
            Slot::List(list) => *list = values(),
            Slot::Scalar(scalar) => *scalar = values().into_iter().next(),
        }
    }

    lesson
}

/// Text carried by `node` itself: a text node's contents, or for an element
/// the direct text of its only child. Anything else has none.
fn direct_text(node: NodeRef<Node>) -> Option<String> {
    match node.value() {
        Node::Text(text) => Some(String::from(&**text)),
        Node::Element(_) => {
            let mut children = node.children();
            match (children.next(), children.next()) {
                (Some(only), None) => direct_text(only),
                _ => None,
            }
        }
        _ => None,
    }
}

/// One entry per direct child carrying text; `<br>` and friends are skipped.
fn line_texts(cell: ElementRef) -> Vec<String> {
    cell.children().filter_map(direct_text).collect()
}

fn bold_texts(cell: ElementRef, bold_sel: &Selector) -> Vec<String> {
    cell.select(bold_sel)
        .filter_map(|b| direct_text(*b))
        .collect()
}
