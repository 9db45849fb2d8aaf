use std::path::PathBuf;

use waiter_core::menu::Catalog;

use crate::commands::{load_config, CommandResult, EXIT_CONFIG, EXIT_MENU};

pub fn run(config_path: Option<PathBuf>, limit: Option<usize>) -> CommandResult {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("menu", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let catalog = match Catalog::try_load(&config.menu.path) {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::failure("menu", "menu_load", error.to_string(), EXIT_MENU),
    };

    let limit = limit.unwrap_or(config.menu.display_limit);
    CommandResult::success("menu", render_listing(&catalog, limit))
}

pub fn render_listing(catalog: &Catalog, limit: usize) -> String {
    let mut lines = vec![format!("{} products", catalog.len())];
    for product in catalog.list_first(limit) {
        let ingredients = if product.ingredients.is_empty() {
            String::new()
        } else {
            format!(" ({})", product.ingredients.join(", "))
        };
        lines.push(format!("{}: {} [{}]{ingredients}", product.name, product.price, product.unit_price()));
    }
    lines.join("\n")
}
