use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use recipe_box::config::Config;
use recipe_box::links::short_link;
use recipe_box::models::{parse_seed, IngredientQuery};
use recipe_box::shopping::EXPORT_FILE_NAME;
use recipe_box::Repository;

#[derive(Parser)]
#[command(name = "recipe-box", version, about = "Recipe catalog and shopping list administration")]
struct Cli {
    /// Config file (defaults to the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load catalog entries from a JSON file
    ImportIngredients {
        /// Defaults to `ingredients_path` from the config
        path: Option<PathBuf>,
    },
    /// List catalog entries
    Ingredients {
        /// Case-insensitive name prefix
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Print or write a user's consolidated shopping list
    ShoppingList {
        #[arg(long)]
        user: i64,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show the short link of a recipe
    Link { recipe_id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    let repository = Repository::new(&config.db_path)
        .await
        .with_context(|| format!("opening database {}", config.db_path))?;

    match cli.command {
        Command::ImportIngredients { path } => {
            let path = path
                .or_else(|| config.ingredients_path.as_ref().map(PathBuf::from))
                .context("no ingredients file given and none configured")?;
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {:?}", path))?;
            let created = repository.import_ingredients(parse_seed(&json)?).await?;
            println!("Imported {} new ingredients from {:?}", created, path);
        }

        Command::Ingredients { prefix } => {
            let query = prefix
                .as_deref()
                .map(IngredientQuery::name_starts_with)
                .unwrap_or_default();
            for ingredient in repository.search_ingredients(&query).await? {
                println!("{}\t{}, {}", ingredient.id, ingredient.name, ingredient.unit);
            }
        }

        Command::ShoppingList { user, output } => {
            repository.get_user(user).await?;
            let content = repository.shopping_list(user).await?.render();
            match output {
                Some(path) => {
                    let path = if path.is_dir() { path.join(EXPORT_FILE_NAME) } else { path };
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {:?}", path))?;
                    println!("Shopping list written to {:?}", path);
                }
                None => println!("{}", content),
            }
        }

        Command::Link { recipe_id } => {
            let target = repository.resolve_short_link(recipe_id).await?;
            let link = short_link(&config.base_url, recipe_id)?;
            println!("{} -> {}", link, target);
        }
    }

    Ok(())
}
