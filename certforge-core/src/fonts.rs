//! Font Resolver - logical font names to loaded faces
//!
//! The catalogue is a static priority table. Installed fonts are discovered
//! through a `fontdb` database and indexed by file name; [`FontResolver`]
//! loads every candidate once at construction and hands out cheap clones of
//! the parsed faces afterwards, so rendering never touches the filesystem.

use rusttype::{point, Font, Rect, Scale};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bitmap_font;

/// Candidates used for logical names missing from the table.
pub const FALLBACK_CANDIDATES: &[&str] = &["DejaVuSans-Bold.ttf"];

/// Environment variable holding extra font directories (platform path list).
/// Fonts found there win over installed fonts with the same file name.
pub const FONT_DIRS_ENV: &str = "CERTFORGE_FONT_DIRS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontCategory {
    SansSerif,
    Serif,
    Monospace,
    Display,
    Script,
    Fallback,
}

impl FontCategory {
    pub const ALL: [FontCategory; 6] = [
        Self::SansSerif,
        Self::Serif,
        Self::Monospace,
        Self::Display,
        Self::Script,
        Self::Fallback,
    ];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::SansSerif => &["Arial", "Calibri", "Tahoma", "Verdana", "Trebuchet", "Segoe"],
            Self::Serif => &["Times", "Georgia", "Palatino", "Book", "Garamond"],
            Self::Monospace => &["Courier", "Consolas", "Lucida Console"],
            Self::Display => &["Century", "Impact", "Franklin", "Gill", "Candara", "Corbel", "Rockwell"],
            Self::Script => &["Brush", "Handwriting", "Calligraphy", "Comic"],
            Self::Fallback => &["DejaVu"],
        }
    }

    /// Keyword match on the logical name. A name can fall in no category.
    pub fn classify(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cat| cat.keywords().iter().any(|k| name.contains(k)))
    }
}

/// One logical font and its candidate files, highest priority first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontSpec {
    pub name: String,
    pub candidates: Vec<String>,
}

#[rustfmt::skip]
const BUILTIN_FONTS: &[(&str, [&str; 2])] = &[
    ("Arial Regular",          ["arial.ttf",    "DejaVuSans.ttf"]),
    ("Arial Bold",             ["arialbd.ttf",  "DejaVuSans-Bold.ttf"]),
    ("Arial Italic",           ["ariali.ttf",   "DejaVuSans-Oblique.ttf"]),
    ("Arial Bold Italic",      ["arialbi.ttf",  "DejaVuSans-BoldOblique.ttf"]),
    ("Calibri Regular",        ["calibri.ttf",  "DejaVuSans.ttf"]),
    ("Calibri Bold",           ["calibrib.ttf", "DejaVuSans-Bold.ttf"]),
    ("Calibri Italic",         ["calibrii.ttf", "DejaVuSans-Oblique.ttf"]),
    ("Tahoma Regular",         ["tahoma.ttf",   "DejaVuSans.ttf"]),
    ("Tahoma Bold",            ["tahomabd.ttf", "DejaVuSans-Bold.ttf"]),
    ("Verdana Regular",        ["verdana.ttf",  "DejaVuSans.ttf"]),
    ("Verdana Bold",           ["verdanab.ttf", "DejaVuSans-Bold.ttf"]),
    ("Trebuchet MS",           ["trebuc.ttf",   "DejaVuSans.ttf"]),
    ("Trebuchet Bold",         ["trebucbd.ttf", "DejaVuSans-Bold.ttf"]),
    ("Segoe UI",               ["segoeui.ttf",  "DejaVuSans.ttf"]),
    ("Segoe UI Bold",          ["segoeuib.ttf", "DejaVuSans-Bold.ttf"]),
    ("Segoe UI Light",         ["segoeuil.ttf", "DejaVuSans.ttf"]),
    ("Segoe UI Italic",        ["segoeuii.ttf", "DejaVuSans-Oblique.ttf"]),
    ("Times New Roman",        ["times.ttf",    "DejaVuSerif.ttf"]),
    ("Times New Roman Bold",   ["timesbd.ttf",  "DejaVuSerif-Bold.ttf"]),
    ("Times New Roman Italic", ["timesi.ttf",   "DejaVuSerif-Italic.ttf"]),
    ("Times NR Bold Italic",   ["timesbi.ttf",  "DejaVuSerif-BoldItalic.ttf"]),
    ("Georgia Regular",        ["georgia.ttf",  "DejaVuSerif.ttf"]),
    ("Georgia Bold",           ["georgiab.ttf", "DejaVuSerif-Bold.ttf"]),
    ("Georgia Italic",         ["georgiai.ttf", "DejaVuSerif-Italic.ttf"]),
    ("Palatino Linotype",      ["pala.ttf",     "DejaVuSerif.ttf"]),
    ("Palatino Bold",          ["palab.ttf",    "DejaVuSerif-Bold.ttf"]),
    ("Palatino Italic",        ["palai.ttf",    "DejaVuSerif-Italic.ttf"]),
    ("Book Antiqua",           ["bkant.ttf",    "DejaVuSerif.ttf"]),
    ("Garamond",               ["GARA.TTF",     "DejaVuSerif.ttf"]),
    ("Garamond Bold",          ["GARABD.TTF",   "DejaVuSerif-Bold.ttf"]),
    ("Garamond Italic",        ["GARAIT.TTF",   "DejaVuSerif-Italic.ttf"]),
    ("Courier New",            ["cour.ttf",     "DejaVuSansMono.ttf"]),
    ("Courier New Bold",       ["courbd.ttf",   "DejaVuSansMono-Bold.ttf"]),
    ("Courier New Italic",     ["couri.ttf",    "DejaVuSansMono-Oblique.ttf"]),
    ("Consolas",               ["consola.ttf",  "DejaVuSansMono.ttf"]),
    ("Consolas Bold",          ["consolab.ttf", "DejaVuSansMono-Bold.ttf"]),
    ("Lucida Console",         ["lucon.ttf",    "DejaVuSansMono.ttf"]),
    ("Century Gothic",         ["GOTHIC.TTF",   "DejaVuSans.ttf"]),
    ("Century Gothic Bold",    ["GOTHICB.TTF",  "DejaVuSans-Bold.ttf"]),
    ("Century Gothic Italic",  ["GOTHICI.TTF",  "DejaVuSans-Oblique.ttf"]),
    ("Impact",                 ["impact.ttf",   "DejaVuSans-Bold.ttf"]),
    ("Franklin Gothic",        ["framd.ttf",    "DejaVuSans-Bold.ttf"]),
    ("Gill Sans MT",           ["GILSANUB.TTF", "DejaVuSans.ttf"]),
    ("Candara Regular",        ["Candara.ttf",  "DejaVuSans.ttf"]),
    ("Candara Bold",           ["Candarab.ttf", "DejaVuSans-Bold.ttf"]),
    ("Corbel Regular",         ["corbel.ttf",   "DejaVuSans.ttf"]),
    ("Corbel Bold",            ["corbelb.ttf",  "DejaVuSans-Bold.ttf"]),
    ("Rockwell",               ["ROCK.TTF",     "DejaVuSerif.ttf"]),
    ("Rockwell Bold",          ["ROCKB.TTF",    "DejaVuSerif-Bold.ttf"]),
    ("Brush Script MT",        ["BRUSHSCI.TTF", "DejaVuSerif-Italic.ttf"]),
    ("Lucida Handwriting",     ["lhandw.ttf",   "DejaVuSerif-Italic.ttf"]),
    ("Lucida Calligraphy",     ["LCALLIG.TTF",  "DejaVuSerif-Italic.ttf"]),
    ("Comic Sans MS",          ["comic.ttf",    "DejaVuSans.ttf"]),
    ("Comic Sans MS Bold",     ["comicbd.ttf",  "DejaVuSans-Bold.ttf"]),
    ("DejaVu Sans",            ["DejaVuSans.ttf",          "DejaVuSans.ttf"]),
    ("DejaVu Sans Bold",       ["DejaVuSans-Bold.ttf",     "DejaVuSans-Bold.ttf"]),
    ("DejaVu Serif",           ["DejaVuSerif.ttf",         "DejaVuSerif.ttf"]),
    ("DejaVu Serif Bold",      ["DejaVuSerif-Bold.ttf",    "DejaVuSerif-Bold.ttf"]),
    ("DejaVu Mono",            ["DejaVuSansMono.ttf",      "DejaVuSansMono.ttf"]),
    ("DejaVu Mono Bold",       ["DejaVuSansMono-Bold.ttf", "DejaVuSansMono-Bold.ttf"]),
];

/// Font catalogue - ordered, immutable once handed to a resolver
#[derive(Debug, Clone, Default)]
pub struct FontTable {
    specs: Vec<FontSpec>,
}

impl FontTable {
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// The stock catalogue: common office faces backed by DejaVu.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (name, candidates) in BUILTIN_FONTS {
            table.register(FontSpec {
                name: name.to_string(),
                candidates: candidates.iter().map(|c| c.to_string()).collect(),
            });
        }
        table
    }

    /// Adds or replaces a logical font. Replacement keeps the original slot.
    pub fn register(&mut self, spec: FontSpec) {
        match self.specs.iter_mut().find(|s| s.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FontSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn list(&self) -> &[FontSpec] {
        &self.specs
    }

    /// Candidate list for `name`, or the fallback list when it is unknown.
    pub fn candidates_for(&self, name: &str) -> (Vec<String>, bool) {
        match self.get(name) {
            Some(spec) => (spec.candidates.clone(), true),
            None => (
                FALLBACK_CANDIDATES.iter().map(|c| c.to_string()).collect(),
                false,
            ),
        }
    }

    pub fn by_category(&self, category: FontCategory) -> Vec<&FontSpec> {
        self.specs
            .iter()
            .filter(|s| FontCategory::classify(&s.name) == Some(category))
            .collect()
    }

    /// Case-insensitive substring search over logical names.
    pub fn search(&self, query: &str) -> Vec<&FontSpec> {
        let needle = query.trim().to_lowercase();
        self.specs
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .collect()
    }

    fn all_candidate_files(&self) -> impl Iterator<Item = &str> {
        self.specs
            .iter()
            .flat_map(|s| s.candidates.iter().map(String::as_str))
            .chain(FALLBACK_CANDIDATES.iter().copied())
    }
}

/// Where a resolved font came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "camelCase")]
pub enum FontSource {
    /// A candidate registered for the requested name loaded.
    Registered(PathBuf),
    /// The name was unknown and the fallback list supplied the face.
    Fallback(PathBuf),
    /// Nothing loaded; the built-in bitmap face is in use at its fixed size.
    Unavailable,
}

/// Tight ink box of a laid-out string, relative to the layout origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl TextBox {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn from_bounds(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).max(0) as u32,
            height: (max_y - min_y).max(0) as u32,
        }
    }
}

#[derive(Clone)]
enum Face {
    Outline(Font<'static>),
    Bitmap,
}

/// A face ready to measure and draw at one size.
#[derive(Clone)]
pub struct LoadedFont {
    face: Face,
    size: f32,
    source: FontSource,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont")
            .field("size", &self.size)
            .field("source", &self.source)
            .finish()
    }
}

impl LoadedFont {
    /// The degraded built-in face. Its size is fixed regardless of request.
    pub fn builtin() -> Self {
        Self {
            face: Face::Bitmap,
            size: bitmap_font::LINE_HEIGHT as f32,
            source: FontSource::Unavailable,
        }
    }

    pub fn source(&self) -> &FontSource {
        &self.source
    }

    /// Effective pixel size; differs from the request for the bitmap face.
    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.source, FontSource::Unavailable)
    }

    /// Measures the tight ink box using real glyph metrics.
    pub fn measure(&self, text: &str) -> TextBox {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        let mut grow = |x0: i32, y0: i32, x1: i32, y1: i32| {
            bounds = Some(match bounds {
                Some((a, b, c, d)) => (a.min(x0), b.min(y0), c.max(x1), d.max(y1)),
                None => (x0, y0, x1, y1),
            });
        };
        match &self.face {
            Face::Outline(font) => {
                for glyph in layout(font, text, self.size) {
                    if let Some(bb) = glyph.pixel_bounding_box() {
                        grow(bb.min.x, bb.min.y, bb.max.x, bb.max.y);
                    }
                }
            }
            Face::Bitmap => {
                bitmap_font::for_each_pixel(text, |x, y| grow(x, y, x + 1, y + 1));
            }
        }
        bounds
            .map(|(x0, y0, x1, y1)| TextBox::from_bounds(x0, y0, x1, y1))
            .unwrap_or_default()
    }

    /// Rasterizes `text` shifted by (dx, dy), reporting per-pixel coverage in 0..=1.
    pub fn draw(&self, text: &str, dx: i32, dy: i32, mut plot: impl FnMut(i32, i32, f32)) {
        match &self.face {
            Face::Outline(font) => {
                for glyph in layout(font, text, self.size) {
                    let Some(Rect { min, .. }) = glyph.pixel_bounding_box() else {
                        continue;
                    };
                    glyph.draw(|gx, gy, coverage| {
                        plot(min.x + gx as i32 + dx, min.y + gy as i32 + dy, coverage)
                    });
                }
            }
            Face::Bitmap => {
                bitmap_font::for_each_pixel(text, |x, y| plot(x + dx, y + dy, 1.0));
            }
        }
    }
}

fn layout<'a>(
    font: &'a Font<'static>,
    text: &'a str,
    size: f32,
) -> impl Iterator<Item = rusttype::PositionedGlyph<'static>> + 'a {
    let scale = Scale::uniform(size);
    let ascent = font.v_metrics(scale).ascent;
    font.layout(text, scale, point(0.0, ascent))
}

/// Resolution status of one logical name, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontStatus {
    pub name: String,
    pub category: Option<FontCategory>,
    pub source: FontSource,
}

/// Resolves logical names against faces loaded once at construction.
pub struct FontResolver {
    table: FontTable,
    faces: HashMap<String, Option<(PathBuf, Font<'static>)>>,
}

impl FontResolver {
    /// Loads every candidate in `table` against the fonts under `search_dirs`.
    pub fn new(table: FontTable, search_dirs: &[PathBuf]) -> Self {
        let mut db = fontdb::Database::new();
        for dir in search_dirs {
            db.load_fonts_dir(dir);
        }
        Self::from_database(table, &db)
    }

    /// Builtin catalogue against `CERTFORGE_FONT_DIRS` and the installed fonts.
    pub fn with_system_fonts() -> Self {
        let mut db = fontdb::Database::new();
        for dir in extra_font_dirs() {
            db.load_fonts_dir(dir);
        }
        db.load_system_fonts();
        Self::from_database(FontTable::builtin(), &db)
    }

    /// A resolver with no loadable faces; every name resolves to the bitmap face.
    pub fn offline(table: FontTable) -> Self {
        Self::from_database(table, &fontdb::Database::new())
    }

    /// Loads every candidate in `table` against an already populated database.
    /// When two faces share a file name, the one loaded first wins.
    pub fn from_database(table: FontTable, db: &fontdb::Database) -> Self {
        let index = index_faces(db);
        tracing::debug!(faces = db.len(), files = index.len(), "font database indexed");
        let mut faces = HashMap::new();
        for file in table.all_candidate_files() {
            if faces.contains_key(file) {
                continue;
            }
            let loaded = load_candidate(file, db, &index);
            match &loaded {
                Some((path, _)) => tracing::debug!(file, path = %path.display(), "font loaded"),
                None => tracing::debug!(file, "font candidate unavailable"),
            }
            faces.insert(file.to_string(), loaded);
        }
        Self { table, faces }
    }

    pub fn table(&self) -> &FontTable {
        &self.table
    }

    /// First loadable candidate for `name` at `size`, else the bitmap default.
    pub fn resolve(&self, name: &str, size: u32) -> LoadedFont {
        match self.lookup(name) {
            Some((source, font)) => LoadedFont {
                face: Face::Outline(font),
                size: size as f32,
                source,
            },
            None => {
                tracing::warn!(font = name, size, "no candidate font loaded, using built-in bitmap face");
                LoadedFont::builtin()
            }
        }
    }

    pub fn status(&self) -> Vec<FontStatus> {
        self.table
            .list()
            .iter()
            .map(|spec| FontStatus {
                name: spec.name.clone(),
                category: FontCategory::classify(&spec.name),
                source: self
                    .lookup(&spec.name)
                    .map(|(source, _)| source)
                    .unwrap_or(FontSource::Unavailable),
            })
            .collect()
    }

    fn lookup(&self, name: &str) -> Option<(FontSource, Font<'static>)> {
        let (candidates, known) = self.table.candidates_for(name);
        let (path, font) = candidates
            .iter()
            .find_map(|file| self.faces.get(file.as_str()).cloned().flatten())?;
        let source = if known {
            FontSource::Registered(path)
        } else {
            FontSource::Fallback(path)
        };
        Some((source, font))
    }
}

/// Directories listed in `CERTFORGE_FONT_DIRS`, in order.
pub fn extra_font_dirs() -> Vec<PathBuf> {
    std::env::var_os(FONT_DIRS_ENV)
        .map(|v| std::env::split_paths(&v).collect())
        .unwrap_or_default()
}

/// File-backed faces keyed by lowercase file name, first loaded first.
fn index_faces(db: &fontdb::Database) -> HashMap<String, (PathBuf, fontdb::ID)> {
    let mut index = HashMap::new();
    for face in db.faces() {
        let path = match &face.source {
            fontdb::Source::File(path) | fontdb::Source::SharedFile(path, _) => path,
            _ => continue,
        };
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            index
                .entry(name.to_lowercase())
                .or_insert_with(|| (path.clone(), face.id));
        }
    }
    index
}

/// A candidate is either a path to a font file or a bare file name looked up
/// in the database index.
fn load_candidate(
    file: &str,
    db: &fontdb::Database,
    index: &HashMap<String, (PathBuf, fontdb::ID)>,
) -> Option<(PathBuf, Font<'static>)> {
    let direct = Path::new(file);
    if direct.is_file() {
        let font = Font::try_from_vec(fs::read(direct).ok()?)?;
        return Some((direct.to_path_buf(), font));
    }
    let (path, id) = index.get(&file.to_lowercase())?;
    let font = db
        .with_face_data(*id, |data, face_index| {
            Font::try_from_vec_and_index(data.to_vec(), face_index)
        })
        .flatten()?;
    Some((path.clone(), font))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_ends_in_dejavu() {
        let table = FontTable::builtin();
        assert!(table.list().len() >= 60);
        for spec in table.list() {
            let last = spec.candidates.last().unwrap();
            assert!(last.starts_with("DejaVu"), "{} ends in {}", spec.name, last);
        }
    }

    #[test]
    fn test_unknown_name_uses_fallback_list() {
        let table = FontTable::builtin();
        let (candidates, known) = table.candidates_for("Wingdings 9");
        assert!(!known);
        assert_eq!(candidates, vec!["DejaVuSans-Bold.ttf".to_string()]);
    }

    #[test]
    fn test_categories() {
        assert_eq!(FontCategory::classify("Georgia Bold"), Some(FontCategory::Serif));
        assert_eq!(FontCategory::classify("Lucida Console"), Some(FontCategory::Monospace));
        assert_eq!(FontCategory::classify("Lucida Handwriting"), Some(FontCategory::Script));
        assert_eq!(FontCategory::classify("DejaVu Mono"), Some(FontCategory::Fallback));
        assert_eq!(FontCategory::classify("Mystery"), None);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let table = FontTable::builtin();
        let hits: Vec<_> = table.search("  segoe ").iter().map(|s| s.name.as_str()).collect();
        assert_eq!(hits, vec!["Segoe UI", "Segoe UI Bold", "Segoe UI Light", "Segoe UI Italic"]);
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut table = FontTable::builtin();
        let before = table.list().len();
        table.register(FontSpec {
            name: "Impact".to_string(),
            candidates: vec!["impact2.ttf".to_string()],
        });
        assert_eq!(table.list().len(), before);
        assert_eq!(table.get("Impact").unwrap().candidates, vec!["impact2.ttf"]);
    }

    #[test]
    fn test_offline_resolver_degrades_to_bitmap() {
        let resolver = FontResolver::offline(FontTable::builtin());
        let font = resolver.resolve("Arial Bold", 72);
        assert_eq!(font.source(), &FontSource::Unavailable);
        assert!(font.is_degraded());
        assert_eq!(font.size(), bitmap_font::LINE_HEIGHT as f32);
    }

    #[test]
    fn test_unreadable_candidate_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("arialbd.ttf"), b"not a font").unwrap();
        let resolver = FontResolver::new(FontTable::builtin(), &[dir.path().to_path_buf()]);
        assert!(resolver.resolve("Arial Bold", 40).is_degraded());
    }

    #[test]
    fn test_candidate_found_in_search_dir() {
        let mut installed = fontdb::Database::new();
        installed.load_system_fonts();
        let Some((source, _)) = index_faces(&installed).remove("dejavusans-bold.ttf") else {
            eprintln!("DejaVuSans-Bold.ttf not installed; skipping");
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        fs::copy(&source, dir.path().join("DejaVuSans-Bold.ttf")).unwrap();

        let resolver = FontResolver::new(FontTable::builtin(), &[dir.path().to_path_buf()]);
        let font = resolver.resolve("Arial Bold", 48);
        match font.source() {
            FontSource::Registered(path) => {
                assert_eq!(path.file_name().unwrap(), "DejaVuSans-Bold.ttf");
            }
            other => panic!("expected registered face, got {:?}", other),
        }
        assert!(matches!(
            resolver.resolve("Wingdings 9", 48).source(),
            FontSource::Fallback(_)
        ));
        assert!(!font.measure("Ali").is_empty());
    }

    #[test]
    fn test_bitmap_measure_empty_text() {
        let font = LoadedFont::builtin();
        assert!(font.measure("").is_empty());
        assert!(font.measure("   ").is_empty());
    }
}
