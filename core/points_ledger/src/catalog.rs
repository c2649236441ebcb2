//! Static catalog of waste types, marketplace products and funding projects.
//!
//! Loaded once at startup, validated, then shared read-only.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{EntityKind, LedgerError, Result};
use crate::types::{Points, Product, ProjectConfig, ProjectState, WasteType};

/// Highest intake rate a catalog may declare.
pub const MAX_POINTS_PER_KG: Points = 1_000_000;

/// A project's immutable config plus the pool size it starts with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectSeed {
    #[serde(flatten)]
    pub config: ProjectConfig,
    #[serde(default)]
    pub current_points: Points,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub waste_types: Vec<WasteType>,
    pub products: Vec<Product>,
    pub projects: Vec<ProjectSeed>,
}

impl Catalog {
    /// The demo catalog shipped with the program.
    pub fn builtin() -> Self {
        let waste_types = vec![
            waste("food", "Food scraps", 20),
            waste("garden", "Garden waste", 15),
            waste("coffee", "Coffee grounds and filters", 25),
            waste("eggshells", "Eggshells", 30),
        ];
        let products = vec![
            product("prod1", "Premium Compost", "5 kg of high-quality compost for your plants", 200, "Gardening"),
            product("prod2", "Gardening Kit", "Set of eco-friendly garden tools", 350, "Gardening"),
            product("prod3", "Organic Seeds", "Pack of seasonal organic seeds", 150, "Gardening"),
            product("prod4", "Compostable Bags", "Pack of 50 fully compostable bags", 100, "Home"),
            product("prod5", "Reusable Bottle", "750 ml stainless steel bottle", 230, "Home"),
            product("prod6", "Composting Course", "Online course on home composting techniques", 180, "Education"),
            product("prod7", "Space Ranger Toy", "Action figure from the space ranger game", 150, "Entertainment"),
        ];
        let projects = vec![
            project(
                "proj1",
                "Amazon Reforestation",
                "Plant native trees in deforested areas of the Amazon",
                (500, 320, 10_000),
                "Every 500 points = 1 tree planted",
            ),
            project(
                "proj2",
                "Rural Solar Power",
                "Install solar panels in communities without electricity",
                (1_000, 750, 20_000),
                "Every 1000 points = 1 solar panel",
            ),
            project(
                "proj3",
                "Ocean Cleanup",
                "Recover plastics from polluted coastal areas",
                (300, 210, 5_000),
                "Every 300 points = 5 kg of plastic recovered",
            ),
            project(
                "proj4",
                "Environmental Education",
                "Environmental education workshops for rural schools",
                (200, 130, 3_000),
                "Every 200 points = 1 workshop",
            ),
        ];
        Self {
            waste_types,
            products,
            projects,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(raw)
            .map_err(|e| LedgerError::InvalidCatalog(format!("malformed catalog JSON: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::InvalidCatalog(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        unique_ids("waste type", self.waste_types.iter().map(|w| w.id.as_str()))?;
        unique_ids("product", self.products.iter().map(|p| p.id.as_str()))?;
        unique_ids("project", self.projects.iter().map(|p| p.config.id.as_str()))?;

        if let Some(w) = self.waste_types.iter().find(|w| w.points_per_kg == 0) {
            return Err(invalid(format!("waste type {} has a zero rate", w.id)));
        }
        if let Some(w) = self.waste_types.iter().find(|w| w.points_per_kg > MAX_POINTS_PER_KG) {
            return Err(invalid(format!(
                "waste type {} rate {} exceeds {MAX_POINTS_PER_KG} points per kg",
                w.id, w.points_per_kg
            )));
        }
        if let Some(p) = self.products.iter().find(|p| p.points == 0) {
            return Err(invalid(format!("product {} has a zero price", p.id)));
        }
        for seed in &self.projects {
            let config = &seed.config;
            if config.total_points == 0 || config.points_needed == 0 {
                return Err(invalid(format!("project {} has a zero target", config.id)));
            }
            if seed.current_points > config.total_points {
                return Err(invalid(format!(
                    "project {} starts above its target ({} > {})",
                    config.id, seed.current_points, config.total_points
                )));
            }
        }
        Ok(())
    }

    pub fn waste_type(&self, id: &str) -> Result<&WasteType> {
        self.waste_types
            .iter()
            .find(|w| w.id == id)
            .ok_or_else(|| LedgerError::unknown(EntityKind::WasteType, id))
    }

    pub fn product(&self, id: &str) -> Result<&Product> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| LedgerError::unknown(EntityKind::Product, id))
    }

    pub fn project(&self, id: &str) -> Result<&ProjectConfig> {
        self.projects
            .iter()
            .map(|p| &p.config)
            .find(|p| p.id == id)
            .ok_or_else(|| LedgerError::unknown(EntityKind::Project, id))
    }

    /// Initial pool of every project, for seeding a store.
    pub fn project_states(&self) -> impl Iterator<Item = (String, ProjectState)> + '_ {
        self.projects.iter().map(|p| {
            (
                p.config.id.clone(),
                ProjectState {
                    current_points: p.current_points,
                },
            )
        })
    }

    /// Distinct product categories in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.products
            .iter()
            .map(|p| p.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Products in `category` (`None` or `"all"` for every category) whose
    /// name or description contains `query`, case-insensitively.
    pub fn search_products(&self, category: Option<&str>, query: &str) -> Vec<&Product> {
        let query = query.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| match category {
                None | Some("all") => true,
                Some(c) => p.category == c,
            })
            .filter(|p| {
                query.is_empty()
                    || p.name.to_lowercase().contains(&query)
                    || p.description.to_lowercase().contains(&query)
            })
            .collect()
    }
}

fn invalid(msg: String) -> LedgerError {
    LedgerError::InvalidCatalog(msg)
}

fn unique_ids<'a>(table: &str, ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(invalid(format!("{table} with an empty id")));
        }
        if !seen.insert(id) {
            return Err(invalid(format!("duplicate {table} id {id}")));
        }
    }
    Ok(())
}

fn waste(id: &str, name: &str, points_per_kg: Points) -> WasteType {
    WasteType {
        id: id.to_string(),
        name: name.to_string(),
        points_per_kg,
    }
}

fn product(id: &str, name: &str, description: &str, points: Points, category: &str) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        points,
        category: category.to_string(),
        eco: true,
    }
}

/// `points` is `(points_needed, current_points, total_points)`.
fn project(
    id: &str,
    name: &str,
    description: &str,
    points: (Points, Points, Points),
    impact: &str,
) -> ProjectSeed {
    let (points_needed, current_points, total_points) = points;
    ProjectSeed {
        config: ProjectConfig {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            points_needed,
            total_points,
            impact: impact.to_string(),
        },
        current_points,
    }
}
