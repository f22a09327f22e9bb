//! Certificate Forge CLI
//!
//! Commands: settings, fonts, register, roster, preview, generate
//! Outputs JSON to stdout, diagnostics to stderr
//! Returns 2 on rejected input, 1 on other failures

use base64::Engine;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use certforge_core::{
    fonts::FontCategory,
    pipeline::{CertificatePipeline, OutputFormats, RenderRequest},
    roster::{RegistrationForm, Roster},
    settings::{JsonSettingsStore, SettingsStore},
    CertError, FontResolver,
};

#[derive(Parser)]
#[command(name = "certforge-cli")]
#[command(about = "Certificate Forge - batch certificate renderer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Event settings file
    #[arg(short, long, default_value = "certforge.json")]
    settings: PathBuf,

    /// Registration roster file
    #[arg(short, long, default_value = "registrations.json")]
    roster: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Show settings, applying and saving any overrides given
    Settings {
        #[arg(long)]
        event_name: Option<String>,
        #[arg(long)]
        event_date: Option<String>,
        #[arg(long)]
        venue: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        organizer: Option<String>,
        /// Comma separated categories
        #[arg(long)]
        categories: Option<String>,
        #[arg(long)]
        x_pct: Option<f64>,
        #[arg(long)]
        y_pct: Option<f64>,
        #[arg(long)]
        font: Option<String>,
        #[arg(long)]
        font_size: Option<u32>,
        /// Text color as #rrggbb
        #[arg(long)]
        color: Option<String>,
    },

    /// List or search the font catalogue
    Fonts {
        /// Substring to search for
        #[arg(short, long)]
        query: Option<String>,

        /// Category filter (sansSerif, serif, monospace, display, script, fallback)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Add a registration to the roster
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        roll_no: String,
        #[arg(long, default_value = "")]
        department: String,
        #[arg(long, default_value = "")]
        batch: String,
        #[arg(long, default_value = "")]
        category: String,
    },

    /// Summarize, export or clear the roster
    Roster {
        /// Only records in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Plain text export instead of JSON summary
        #[arg(long)]
        text: bool,

        /// Also write the roster as an xlsx workbook here
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Remove every registration from the roster file
        #[arg(long, conflicts_with_all = ["category", "text", "xlsx"])]
        clear: bool,
    },

    /// Render a single certificate
    Preview {
        #[arg(short, long)]
        template: PathBuf,
        #[arg(short, long)]
        name: String,
        /// PNG output path; inline base64 when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Also write the page document here
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// Render the whole roster into a zip archive
    Generate {
        #[arg(short, long)]
        template: PathBuf,
        /// Archive path; defaults to <event>_Certificates.zip
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long)]
        no_png: bool,
        #[arg(long)]
        no_pdf: bool,
    },
}

fn emit(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => println!(r#"{{"success": false, "error": "{}"}}"#, e),
    }
}

fn fail(error: impl std::fmt::Display) -> ExitCode {
    emit(&serde_json::json!({ "success": false, "error": error.to_string() }));
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,certforge_cli=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = JsonSettingsStore::new(&cli.settings);
    let settings = match store.load() {
        Ok(s) => s,
        Err(e) => return fail(format!("Failed to load settings: {}", e)),
    };

    match cli.command {
        Commands::Settings {
            event_name,
            event_date,
            venue,
            topic,
            organizer,
            categories,
            x_pct,
            y_pct,
            font,
            font_size,
            color,
        } => {
            let mut updated = settings.clone();
            if let Some(v) = event_name { updated.event_name = v; }
            if let Some(v) = event_date { updated.event_date = v; }
            if let Some(v) = venue { updated.event_venue = v; }
            if let Some(v) = topic { updated.event_topic = v; }
            if let Some(v) = organizer { updated.organizer = v; }
            if let Some(v) = categories { updated.categories = v; }
            if let Some(v) = x_pct { updated.placement.x_pct = v; }
            if let Some(v) = y_pct { updated.placement.y_pct = v; }
            if let Some(v) = font { updated.placement.font_name = v; }
            if let Some(v) = font_size { updated.placement.font_size = v; }
            if let Some(v) = color { updated.placement.color = v; }

            if let Err(e) = updated.placement.validate() {
                emit(&serde_json::json!({ "success": false, "error": e.to_string() }));
                return ExitCode::from(2);
            }
            if updated != settings {
                if let Err(e) = store.save(&updated) {
                    return fail(e);
                }
            }
            emit(&updated);
            ExitCode::SUCCESS
        }

        Commands::Fonts { query, category } => {
            let resolver = FontResolver::with_system_fonts();
            let wanted = match category.as_deref().map(parse_category).transpose() {
                Ok(c) => c,
                Err(e) => return fail(e),
            };
            let table = resolver.table();
            let matched: Vec<&str> = table
                .search(query.as_deref().unwrap_or(""))
                .into_iter()
                .map(|s| s.name.as_str())
                .collect();
            let in_category: Option<Vec<&str>> = wanted.map(|c| {
                table.by_category(c).into_iter().map(|s| s.name.as_str()).collect()
            });
            let fonts: Vec<_> = resolver
                .status()
                .into_iter()
                .filter(|f| matched.contains(&f.name.as_str()))
                .filter(|f| in_category.as_ref().map_or(true, |names| names.contains(&f.name.as_str())))
                .collect();
            emit(&fonts);
            ExitCode::SUCCESS
        }

        Commands::Register { name, roll_no, department, batch, category } => {
            let mut roster = match Roster::load(&cli.roster) {
                Ok(r) => r,
                Err(e) => return fail(e),
            };
            let form = RegistrationForm { name, roll_no, department, batch, category };
            let categories = settings.category_list();
            let (record, warnings) =
                match roster.register(&form, &settings.event_name, &categories, Local::now().naive_local()) {
                    Ok((r, w)) => (r.clone(), w),
                    Err(e @ CertError::Registration(_)) => {
                        emit(&serde_json::json!({ "success": false, "error": e.to_string() }));
                        return ExitCode::from(2);
                    }
                    Err(e) => return fail(e),
                };
            if let Err(e) = roster.save(&cli.roster) {
                return fail(e);
            }
            emit(&serde_json::json!({
                "success": true,
                "record": record,
                "warnings": warnings,
                "total": roster.len(),
            }));
            ExitCode::SUCCESS
        }

        Commands::Roster { category, text, xlsx, clear } => {
            let mut roster = match Roster::load(&cli.roster) {
                Ok(r) => r,
                Err(e) => return fail(e),
            };
            if clear {
                let removed = roster.clear();
                if let Err(e) = roster.save(&cli.roster) {
                    return fail(e);
                }
                emit(&serde_json::json!({ "success": true, "removed": removed }));
                return ExitCode::SUCCESS;
            }
            let roster = match category {
                Some(c) => Roster::from_records(roster.filter(&c).into_iter().cloned().collect()),
                None => roster,
            };
            if let Some(path) = &xlsx {
                let written = roster.to_xlsx(&settings).and_then(|bytes| Ok(fs::write(path, bytes)?));
                if let Err(e) = written {
                    return fail(e);
                }
            }
            if text {
                println!("{}", roster.to_text());
            } else {
                emit(&serde_json::json!({
                    "event": settings.event_name,
                    "total": roster.len(),
                    "categories": roster.summary(),
                    "xlsx": xlsx,
                }));
            }
            ExitCode::SUCCESS
        }

        Commands::Preview { template, name, out, pdf } => {
            let template_bytes = match fs::read(&template) {
                Ok(b) => b,
                Err(e) => return fail(format!("Failed to read template: {}", e)),
            };
            let pipeline = CertificatePipeline::default();
            let request = RenderRequest::new(&template_bytes, settings.placement.clone(), settings.event_name.clone());
            let (raster, document) = match pipeline.render_document(&request, &name) {
                Ok(r) => r,
                Err(e) => return fail(e),
            };
            let mut output = serde_json::json!({
                "success": true,
                "name": name,
                "width": raster.width,
                "height": raster.height,
                "fontSource": pipeline.fonts().resolve(&settings.placement.font_name, settings.placement.font_size).source(),
            });
            match out {
                Some(path) => {
                    if let Err(e) = fs::write(&path, &raster.png) {
                        return fail(e);
                    }
                    output["png"] = serde_json::json!(path);
                }
                None => {
                    output["pngBase64"] = serde_json::json!(
                        base64::engine::general_purpose::STANDARD.encode(&raster.png)
                    );
                }
            }
            if let Some(path) = pdf {
                if let Err(e) = fs::write(&path, &document.pdf) {
                    return fail(e);
                }
                output["pdf"] = serde_json::json!(path);
            }
            emit(&output);
            ExitCode::SUCCESS
        }

        Commands::Generate { template, out, no_png, no_pdf } => {
            let roster = match Roster::load(&cli.roster) {
                Ok(r) => r,
                Err(e) => return fail(e),
            };
            if roster.is_empty() {
                return fail("Roster is empty");
            }
            let template_bytes = match fs::read(&template) {
                Ok(b) => b,
                Err(e) => return fail(format!("Failed to read template: {}", e)),
            };
            let formats = OutputFormats { raster: !no_png, document: !no_pdf };
            let request = RenderRequest::new(&template_bytes, settings.placement.clone(), settings.event_name.clone())
                .with_formats(formats);

            let pipeline = CertificatePipeline::default();
            let result = pipeline.generate_all(roster.records(), &request, |p| {
                tracing::info!(processed = p.processed, total = p.total, category = p.category, "rendered {}", p.name);
            });
            let output = match result {
                Ok(o) => o,
                Err(e) => {
                    emit(&serde_json::json!({ "success": false, "error": e.to_string() }));
                    return ExitCode::from(2);
                }
            };

            let path = out.unwrap_or_else(|| PathBuf::from(settings.archive_name()));
            if let Err(e) = fs::write(&path, &output.archive) {
                return fail(e);
            }
            emit(&serde_json::json!({
                "success": true,
                "archive": path,
                "manifest": output.manifest,
            }));
            ExitCode::SUCCESS
        }
    }
}

fn parse_category(raw: &str) -> Result<FontCategory, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("Unknown font category: {}", raw))
}
