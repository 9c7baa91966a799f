use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "pricebook")]
#[command(bin_name = "pricebook")]
#[command(version)]
#[command(about = "A directory-backed catalog of priced, ordered commodities")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'C',
        long,
        env = "PRICEBOOK_DIR",
        default_value = ".",
        help = "Catalog directory."
    )]
    pub dir: PathBuf,

    #[arg(
        long,
        env = "PRICEBOOK_CONFIG",
        help = "Config file path (defaults to pricebook.toml in the catalog directory)."
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Create a fresh catalog in the directory.")]
    Create,
    #[command(about = "Open the catalog and print it as JSON.")]
    Show,
    #[command(about = "Run the integrity pass and report the verdict.")]
    Verify,
    #[command(about = "Add a standalone commodity at the last position.")]
    AddCommodity,
    #[command(about = "Add an image from an encoded image file.")]
    AddImage(AddImageArgs),
    #[command(about = "Add a commodity anchored to an image, with a default label.")]
    AddImageCommodity(AddImageCommodityArgs),
    #[command(about = "Update commodity fields.")]
    Set(SetArgs),
    #[command(about = "Update an image's adjustment fields.")]
    SetImage(SetImageArgs),
    #[command(about = "Update a commodity's label placement and typography.")]
    SetLabel(SetLabelArgs),
    #[command(about = "Move a commodity to a position, shifting the ones between.")]
    Move(MoveArgs),
    #[command(about = "Remove a commodity and close its position gap.")]
    Rm(RmArgs),
    #[command(about = "Remove an image, its commodities, and its backing file.")]
    RmImage(RmArgs),
    #[command(about = "Replace an image's backing file.")]
    ReplaceImage(ReplaceImageArgs),
    #[command(about = "Repack all ids and positions to a minimal contiguous layout.")]
    Tidy,
}

#[derive(Debug, Args)]
pub struct AddImageArgs {
    #[arg(short = 'f', long, help = "Path to the encoded image file.")]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct AddImageCommodityArgs {
    #[arg(short = 'i', long, help = "Id of the hosting image.")]
    pub image: i64,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    #[arg(help = "Commodity id.")]
    pub id: i64,

    #[arg(long, help = "New display name.")]
    pub name: Option<String>,

    // Negative amounts parse here so validation can reject them with a
    // proper error instead of a usage failure.
    #[arg(long, allow_negative_numbers = true, help = "New cost.")]
    pub cost: Option<f64>,

    #[arg(long, allow_negative_numbers = true, help = "New whole price.")]
    pub whole_price: Option<f64>,

    #[arg(long, allow_negative_numbers = true, help = "New partial price.")]
    pub partial_price: Option<f64>,

    #[arg(long, allow_negative_numbers = true, help = "New cash price.")]
    pub cash_price: Option<f64>,

    #[arg(long, help = "Include in exports (true/false).")]
    pub exported: Option<bool>,
}

#[derive(Debug, Args)]
pub struct SetImageArgs {
    #[arg(help = "Image id.")]
    pub id: i64,

    #[arg(long, allow_negative_numbers = true, help = "New contrast.")]
    pub contrast: Option<f64>,

    #[arg(long, allow_negative_numbers = true, help = "New brightness.")]
    pub brightness: Option<f64>,

    #[arg(long, help = "Include in exports (true/false).")]
    pub exported: Option<bool>,
}

#[derive(Debug, Args)]
pub struct SetLabelArgs {
    #[arg(help = "Commodity id.")]
    pub id: i64,

    #[arg(
        short = 'x',
        long,
        requires = "y",
        allow_negative_numbers = true,
        help = "Label x within the image."
    )]
    pub x: Option<f64>,

    #[arg(
        short = 'y',
        long,
        requires = "x",
        allow_negative_numbers = true,
        help = "Label y within the image."
    )]
    pub y: Option<f64>,

    #[arg(long, help = "Font family name (must be installed).")]
    pub family: Option<String>,

    #[arg(long, allow_negative_numbers = true, help = "Font point size.")]
    pub size: Option<f32>,

    #[arg(long, help = "Bold flag (true/false).")]
    pub bold: Option<bool>,

    #[arg(long, help = "Italic flag (true/false).")]
    pub italic: Option<bool>,

    #[arg(long, help = "Label color as RRGGBB or RRGGBBAA hex.")]
    pub color: Option<String>,
}

#[derive(Debug, Args)]
pub struct MoveArgs {
    #[arg(help = "Commodity id.")]
    pub id: i64,

    #[arg(
        allow_hyphen_values = true,
        help = "Target position; out-of-range values clamp to the ends."
    )]
    pub position: i64,
}

#[derive(Debug, Args)]
pub struct RmArgs {
    #[arg(help = "Entity id.")]
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct ReplaceImageArgs {
    #[arg(help = "Image id.")]
    pub id: i64,

    #[arg(short = 'f', long, help = "Path to the new encoded image file.")]
    pub file: PathBuf,
}
