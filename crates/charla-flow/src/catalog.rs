// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog data model.
//!
//! The menu tree, item captions, and fixed prompts are plain data so a
//! tenant's bot is configured, not coded. The engine walks this
//! structure; it knows nothing about motorcycles.

use charla_core::Language;

/// Index into [`Catalog::menus`]. Menu 0 is the main menu.
pub type MenuId = usize;

/// A string rendered in both supported languages.
#[derive(Debug, Clone)]
pub struct Bilingual {
    pub es: String,
    pub en: String,
}

impl Bilingual {
    pub fn new(es: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            es: es.into(),
            en: en.into(),
        }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Es => &self.es,
            Language::En => &self.en,
        }
    }
}

/// A catalog item rendered as an image with a bilingual caption.
#[derive(Debug, Clone)]
pub struct CatalogItem {
    pub image_url: String,
    pub caption: Bilingual,
}

/// What choosing a menu option does.
#[derive(Debug, Clone)]
pub enum MenuAction {
    /// Descend into a child menu.
    Submenu(MenuId),
    /// Render one catalog item, then wait in the post-content stage.
    ShowItem(CatalogItem),
    /// Send a location pin, then move to the follow-up prompt.
    SendLocation {
        latitude: f64,
        longitude: f64,
        name: String,
        address: String,
    },
    /// Send a document by URL, then move to the follow-up prompt.
    SendDocument {
        url: String,
        filename: String,
        caption: Bilingual,
    },
    /// Enter the financing sub-flow.
    Financing,
    /// Flag the conversation for human hand-off.
    RequestAgent,
}

#[derive(Debug, Clone)]
pub struct MenuOption {
    pub label: Bilingual,
    pub action: MenuAction,
}

#[derive(Debug, Clone)]
pub struct MenuNode {
    pub title: Bilingual,
    pub options: Vec<MenuOption>,
}

/// Fixed prompts that are not tied to a particular menu node.
#[derive(Debug, Clone)]
pub struct FlowTexts {
    /// Bilingual language-selection prompt, shown while language is
    /// unknown. A single combined text, since no language is chosen yet.
    pub language_prompt: String,
    pub agent_confirmation: Bilingual,
    pub follow_up_prompt: Bilingual,
    pub closing_message: Bilingual,
    pub financing_prompt: Bilingual,
    pub content_nav_prompt: Bilingual,
}

/// The full flavor data for one tenant's bot.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub menus: Vec<MenuNode>,
    pub texts: FlowTexts,
}

/// The main menu id.
pub const MAIN_MENU: MenuId = 0;

impl Catalog {
    pub fn menu(&self, id: MenuId) -> &MenuNode {
        &self.menus[id]
    }

    /// Render a menu as numbered options in the given language.
    pub fn render_menu(&self, id: MenuId, language: Language) -> String {
        let menu = self.menu(id);
        let mut out = String::from(menu.title.get(language));
        for (i, option) in menu.options.iter().enumerate() {
            out.push('\n');
            out.push_str(&format!("{}. {}", i + 1, option.label.get(language)));
        }
        out
    }

    /// Bounded invalid-option notice for a stage with options 1..=max.
    pub fn invalid_option_notice(&self, language: Language, max: usize) -> String {
        match language {
            Language::Es => format!("Opción no válida. Elige una opción entre 1 y {max}."),
            Language::En => format!("Invalid option. Choose an option between 1 and {max}."),
        }
    }

    /// Default demo catalog: a small motorcycle dealership with a
    /// three-level menu tree.
    pub fn motorcycle_dealership() -> Self {
        let texts = FlowTexts {
            language_prompt: "¡Hola! Bienvenido a Moto Andina. / Hi! Welcome to Moto Andina.\n\
                              1. Español\n\
                              2. English\n\
                              Elige tu idioma / Choose your language."
                .to_string(),
            agent_confirmation: Bilingual::new(
                "Un asesor te atenderá en breve. Escribe MENU para volver al menú.",
                "An agent will be with you shortly. Type MENU to return to the menu.",
            ),
            follow_up_prompt: Bilingual::new(
                "¿Necesitas algo más?\n1. Volver al menú\n2. No, eso es todo",
                "Anything else?\n1. Back to the menu\n2. No, that's all",
            ),
            closing_message: Bilingual::new(
                "¡Gracias por escribirnos! Escribe MENU cuando quieras volver a empezar.",
                "Thanks for reaching out! Type MENU whenever you want to start again.",
            ),
            financing_prompt: Bilingual::new(
                "Financiamiento Moto Andina: crédito directo desde 20% de inicial.\n\
                 1. Hablar con un asesor de crédito\n\
                 2. Continuar",
                "Moto Andina financing: direct credit from a 20% down payment.\n\
                 1. Talk to a credit advisor\n\
                 2. Continue",
            ),
            content_nav_prompt: Bilingual::new(
                "1. Volver al menú anterior\n2. Menú principal",
                "1. Back to the previous menu\n2. Main menu",
            ),
        };

        let item = |image: &str, es: &str, en: &str| MenuAction::ShowItem(CatalogItem {
            image_url: format!("https://cdn.motoandina.example/catalog/{image}"),
            caption: Bilingual::new(es, en),
        });

        let menus = vec![
            // 0: main menu
            MenuNode {
                title: Bilingual::new(
                    "Menú principal. ¿En qué te ayudamos?",
                    "Main menu. How can we help?",
                ),
                options: vec![
                    MenuOption {
                        label: Bilingual::new("Ver modelos", "See our models"),
                        action: MenuAction::Submenu(1),
                    },
                    MenuOption {
                        label: Bilingual::new("Ubicación de la tienda", "Store location"),
                        action: MenuAction::SendLocation {
                            latitude: -12.089_9,
                            longitude: -77.049_6,
                            name: "Moto Andina".to_string(),
                            address: "Av. Petit Thouars 1234, Lima".to_string(),
                        },
                    },
                    MenuOption {
                        label: Bilingual::new("Lista de precios", "Price list"),
                        action: MenuAction::SendDocument {
                            url: "https://cdn.motoandina.example/docs/precios.pdf".to_string(),
                            filename: "precios.pdf".to_string(),
                            caption: Bilingual::new(
                                "Lista de precios vigente",
                                "Current price list",
                            ),
                        },
                    },
                    MenuOption {
                        label: Bilingual::new("Financiamiento", "Financing"),
                        action: MenuAction::Financing,
                    },
                    MenuOption {
                        label: Bilingual::new("Hablar con un asesor", "Talk to an agent"),
                        action: MenuAction::RequestAgent,
                    },
                ],
            },
            // 1: models
            MenuNode {
                title: Bilingual::new("Nuestras líneas:", "Our lineups:"),
                options: vec![
                    MenuOption {
                        label: Bilingual::new("Scooters", "Scooters"),
                        action: MenuAction::Submenu(2),
                    },
                    MenuOption {
                        label: Bilingual::new("Urbanas", "Street"),
                        action: MenuAction::Submenu(3),
                    },
                    MenuOption {
                        label: Bilingual::new("Aventura", "Adventure"),
                        action: MenuAction::Submenu(4),
                    },
                ],
            },
            // 2: scooters
            MenuNode {
                title: Bilingual::new("Scooters:", "Scooters:"),
                options: vec![
                    MenuOption {
                        label: Bilingual::new("Dash 125", "Dash 125"),
                        action: item(
                            "dash-125.jpg",
                            "Dash 125: ágil y económica, ideal para la ciudad.",
                            "Dash 125: nimble and economical, perfect for the city.",
                        ),
                    },
                    MenuOption {
                        label: Bilingual::new("Urbano 150", "Urbano 150"),
                        action: item(
                            "urbano-150.jpg",
                            "Urbano 150: más potencia con el mismo consumo.",
                            "Urbano 150: more power, same fuel economy.",
                        ),
                    },
                ],
            },
            // 3: street
            MenuNode {
                title: Bilingual::new("Urbanas:", "Street bikes:"),
                options: vec![
                    MenuOption {
                        label: Bilingual::new("Roadster 250", "Roadster 250"),
                        action: item(
                            "roadster-250.jpg",
                            "Roadster 250: naked deportiva de entrada.",
                            "Roadster 250: entry-level sporty naked.",
                        ),
                    },
                    MenuOption {
                        label: Bilingual::new("Roadster 400", "Roadster 400"),
                        action: item(
                            "roadster-400.jpg",
                            "Roadster 400: frenos ABS y pantalla TFT de serie.",
                            "Roadster 400: ABS brakes and TFT display as standard.",
                        ),
                    },
                ],
            },
            // 4: adventure
            MenuNode {
                title: Bilingual::new("Aventura:", "Adventure:"),
                options: vec![
                    MenuOption {
                        label: Bilingual::new("Trail 500", "Trail 500"),
                        action: item(
                            "trail-500.jpg",
                            "Trail 500: doble propósito para todo terreno.",
                            "Trail 500: dual-purpose for any terrain.",
                        ),
                    },
                    MenuOption {
                        label: Bilingual::new("Trail 700 Rally", "Trail 700 Rally"),
                        action: item(
                            "trail-700.jpg",
                            "Trail 700 Rally: suspensión de largo recorrido.",
                            "Trail 700 Rally: long-travel suspension.",
                        ),
                    },
                ],
            },
        ];

        Self { menus, texts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_menu_has_five_options() {
        let catalog = Catalog::motorcycle_dealership();
        assert_eq!(catalog.menu(MAIN_MENU).options.len(), 5);
    }

    #[test]
    fn render_numbers_options_in_selected_language() {
        let catalog = Catalog::motorcycle_dealership();
        let es = catalog.render_menu(MAIN_MENU, Language::Es);
        assert!(es.contains("1. Ver modelos"));
        assert!(es.contains("5. Hablar con un asesor"));
        let en = catalog.render_menu(MAIN_MENU, Language::En);
        assert!(en.contains("1. See our models"));
    }

    #[test]
    fn tree_reaches_depth_three() {
        let catalog = Catalog::motorcycle_dealership();
        // main -> models -> scooters -> item
        let models = match &catalog.menu(MAIN_MENU).options[0].action {
            MenuAction::Submenu(id) => *id,
            other => panic!("expected submenu, got {other:?}"),
        };
        let scooters = match &catalog.menu(models).options[0].action {
            MenuAction::Submenu(id) => *id,
            other => panic!("expected submenu, got {other:?}"),
        };
        assert!(matches!(
            catalog.menu(scooters).options[0].action,
            MenuAction::ShowItem(_)
        ));
    }

    #[test]
    fn invalid_notice_is_bounded() {
        let catalog = Catalog::motorcycle_dealership();
        assert!(catalog
            .invalid_option_notice(Language::Es, 5)
            .contains("entre 1 y 5"));
        assert!(catalog
            .invalid_option_notice(Language::En, 2)
            .contains("between 1 and 2"));
    }
}
