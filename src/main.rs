mod catalog;
mod cli;
mod config;
mod db;
mod domain;
mod events;
mod fonts;
mod imaging;
mod locks;
mod position;
mod tidy;
mod verify;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use catalog::{Catalog, CatalogError};
use config::{Config, ConfigError};
use domain::color::LabelColor;
use domain::commodity::Commodity;
use domain::font::{FontSpec, FontStyle};
use domain::image::CatalogImage;
use imaging::StandardIdentifier;

/// The catalog was held by another process; not an error, but the requested
/// operation did not run.
const EXIT_ALREADY_OPEN: i32 = 2;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

#[derive(Debug)]
enum CliError {
    Catalog(CatalogError),
    Config(ConfigError),
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Catalog(err) => write!(f, "{}", err),
            CliError::Config(err) => write!(f, "{}", err),
            CliError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Catalog(err) => Some(err),
            CliError::Config(err) => Some(err),
            CliError::Io(err) => Some(err),
        }
    }
}

impl From<CatalogError> for CliError {
    fn from(value: CatalogError) -> Self {
        CliError::Catalog(value)
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        CliError::Config(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        CliError::Io(value)
    }
}

#[derive(Serialize)]
struct CatalogView<'a> {
    commodities: &'a [Commodity],
    images: &'a [CatalogImage],
}

fn run() -> Result<(), CliError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    let config_path: PathBuf = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.dir.join(config::CONFIG_FILE_NAME));
    let config = Config::load(&config_path)?;

    let opened = match &cli.command {
        Commands::Create => Catalog::create_with(
            &cli.dir,
            Box::new(StandardIdentifier),
            Box::new(config.font_catalog()),
        )?,
        _ => Catalog::open_with(
            &cli.dir,
            Box::new(StandardIdentifier),
            Box::new(config.font_catalog()),
        )?,
    };
    let Some(mut catalog) = opened else {
        eprintln!("catalog at {} is already open elsewhere", cli.dir.display());
        std::process::exit(EXIT_ALREADY_OPEN);
    };
    catalog.subscribe(|event| eprintln!("event: {}", event));

    match cli.command {
        Commands::Create => {
            println!("created catalog at {}", catalog.dir().display());
        }
        Commands::Show => {
            print_json(&CatalogView {
                commodities: catalog.commodities(),
                images: catalog.images(),
            });
        }
        Commands::Verify => {
            // Opening runs the full integrity pass; reaching here means it
            // held.
            println!(
                "catalog at {} verified: {} commodities, {} images",
                catalog.dir().display(),
                catalog.commodities().len(),
                catalog.images().len()
            );
        }
        Commands::AddCommodity => {
            let id = catalog.add_commodity()?;
            println!("added commodity {id}");
        }
        Commands::AddImage(args) => {
            let bytes = std::fs::read(&args.file)?;
            let id = catalog.add_image(&bytes)?;
            println!("added image {id}");
        }
        Commands::AddImageCommodity(args) => {
            let id = catalog.add_image_commodity(args.image)?;
            println!("added commodity {id} on image {}", args.image);
        }
        Commands::Set(args) => {
            let commodity = catalog
                .commodity_mut(args.id)
                .ok_or(CatalogError::CommodityNotFound(args.id))?;
            if let Some(name) = args.name {
                commodity.set_name(name).map_err(CatalogError::from)?;
            }
            if let Some(cost) = args.cost {
                commodity.set_cost(cost).map_err(CatalogError::from)?;
            }
            if let Some(price) = args.whole_price {
                commodity.set_whole_price(price).map_err(CatalogError::from)?;
            }
            if let Some(price) = args.partial_price {
                commodity
                    .set_partial_price(price)
                    .map_err(CatalogError::from)?;
            }
            if let Some(price) = args.cash_price {
                commodity.set_cash_price(price).map_err(CatalogError::from)?;
            }
            if let Some(exported) = args.exported {
                commodity.set_exported(exported);
            }
            catalog.save_commodity(args.id)?;
            println!("updated commodity {}", args.id);
        }
        Commands::SetImage(args) => {
            let image = catalog
                .image_mut(args.id)
                .ok_or(CatalogError::ImageNotFound(args.id))?;
            if let Some(contrast) = args.contrast {
                image.set_contrast(contrast).map_err(CatalogError::from)?;
            }
            if let Some(brightness) = args.brightness {
                image
                    .set_brightness(brightness)
                    .map_err(CatalogError::from)?;
            }
            if let Some(exported) = args.exported {
                image.set_exported(exported);
            }
            catalog.save_image(args.id)?;
            println!("updated image {}", args.id);
        }
        Commands::SetLabel(args) => {
            if let (Some(x), Some(y)) = (args.x, args.y) {
                catalog.set_label_location(args.id, x, y)?;
            }
            if args.family.is_some()
                || args.size.is_some()
                || args.bold.is_some()
                || args.italic.is_some()
            {
                let current = catalog
                    .commodity(args.id)
                    .ok_or(CatalogError::CommodityNotFound(args.id))?
                    .label()
                    .ok_or(CatalogError::NotAnImageCommodity(args.id))?
                    .font()
                    .clone();
                let style = FontStyle {
                    bold: args.bold.unwrap_or(current.style().bold),
                    italic: args.italic.unwrap_or(current.style().italic),
                };
                let font = FontSpec::new(
                    args.family.unwrap_or_else(|| current.family().to_string()),
                    args.size.unwrap_or_else(|| current.size()),
                    style,
                )
                .map_err(CatalogError::from)?;
                catalog.set_label_font(args.id, font)?;
            }
            if let Some(color) = args.color {
                let color = LabelColor::from_hex(&color).map_err(CatalogError::from)?;
                catalog.set_label_color(args.id, color)?;
            }
            catalog.save_commodity(args.id)?;
            println!("updated label on commodity {}", args.id);
        }
        Commands::Move(args) => {
            catalog.set_position(args.id, args.position)?;
            let landed = catalog
                .commodity(args.id)
                .ok_or(CatalogError::CommodityNotFound(args.id))?
                .position();
            println!("moved commodity {} to position {landed}", args.id);
        }
        Commands::Rm(args) => {
            catalog.delete_commodity(args.id)?;
            println!("removed commodity {}", args.id);
        }
        Commands::RmImage(args) => {
            catalog.delete_image(args.id)?;
            println!("removed image {}", args.id);
        }
        Commands::ReplaceImage(args) => {
            let bytes = std::fs::read(&args.file)?;
            catalog.replace_image_file(args.id, &bytes)?;
            println!("replaced file for image {}", args.id);
        }
        Commands::Tidy => {
            catalog.tidy()?;
            println!(
                "tidied catalog: {} commodities, {} images",
                catalog.commodities().len(),
                catalog.images().len()
            );
        }
    }
    Ok(())
}
