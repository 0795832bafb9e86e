use crate::error::{PulseError, PulseResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperatorConfig {
    pub id: String,
    /// Brand color as `#RRGGBB`, used to key operators in reports.
    pub color: String,
    /// Share of the market, used as the draw weight. All shares sum to 1.
    pub market_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplaintCategory {
    pub id: String,
    /// Bilingual complaint bodies; `{location}` is substituted at generation.
    pub templates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorSettings {
    /// Dates are drawn from `now - window_days ..= now`.
    pub window_days: u64,
    /// Probability that a complaint carries a known governorate.
    pub location_probability: f64,
    pub sentiment_min: f64,
    pub sentiment_max: f64,
    pub likes_max: u32,
    pub replies_max: u32,
    pub source_tag: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            window_days: 60,
            location_probability: 0.7,
            sentiment_min: -0.8,
            sentiment_max: 0.2,
            likes_max: 15,
            replies_max: 5,
            source_tag: "synthetic".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OperatorsFile {
    operators: Vec<OperatorConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct TemplatesFile {
    categories: Vec<ComplaintCategory>,
}

#[derive(Debug, Clone, Deserialize)]
struct GovernoratesFile {
    governorates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PulseConfig {
    pub operators: Vec<OperatorConfig>,
    pub categories: Vec<ComplaintCategory>,
    pub governorates: Vec<String>,
    pub generator: GeneratorSettings,
}

impl PulseConfig {
    /// Load from the data/ directory.
    /// In tests, use PulseConfig::builtin().
    pub fn load(data_dir: impl AsRef<Path>) -> PulseResult<Self> {
        let data_dir = data_dir.as_ref();

        let operators: OperatorsFile = read_json(&data_dir.join("operators/operators.json"))?;
        let templates: TemplatesFile =
            read_json(&data_dir.join("complaints/complaint_templates.json"))?;
        let governorates: GovernoratesFile =
            read_json(&data_dir.join("locations/governorates.json"))?;

        // Generator settings are optional; the built-in defaults apply when absent.
        let generator_path = data_dir.join("generator/generator.json");
        let generator = if generator_path.exists() {
            read_json(&generator_path)?
        } else {
            log::debug!(
                "{} not found, using default generator settings",
                generator_path.display()
            );
            GeneratorSettings::default()
        };

        let config = Self {
            operators: operators.operators,
            categories: templates.categories,
            governorates: governorates.governorates,
            generator,
        };
        config.validate()?;
        log::info!(
            "loaded config from {}: {} operators, {} categories, {} governorates",
            data_dir.display(),
            config.operators.len(),
            config.categories.len(),
            config.governorates.len(),
        );
        Ok(config)
    }

    /// Reject configs the generator cannot draw from.
    pub fn validate(&self) -> PulseResult<()> {
        if self.operators.is_empty() {
            return Err(config_error("at least one operator is required"));
        }
        if let Some(op) = self
            .operators
            .iter()
            .find(|op| !op.market_share.is_finite() || op.market_share < 0.0)
        {
            return Err(config_error(format!(
                "operator '{}' has invalid market share {}",
                op.id, op.market_share
            )));
        }
        if let Some(op) = self.operators.iter().find(|op| !is_hex_color(&op.color)) {
            return Err(config_error(format!(
                "operator '{}' has invalid color '{}', expected #RRGGBB",
                op.id, op.color
            )));
        }
        let share_total: f64 = self.operators.iter().map(|op| op.market_share).sum();
        if (share_total - 1.0).abs() > 1e-6 {
            return Err(config_error(format!(
                "market shares must sum to 1, got {share_total}"
            )));
        }

        if self.categories.is_empty() {
            return Err(config_error("at least one complaint category is required"));
        }
        if let Some(cat) = self.categories.iter().find(|c| c.templates.is_empty()) {
            return Err(config_error(format!(
                "category '{}' has no templates",
                cat.id
            )));
        }

        let g = &self.generator;
        if !(0.0..=1.0).contains(&g.location_probability) {
            return Err(config_error(format!(
                "location_probability {} outside [0, 1]",
                g.location_probability
            )));
        }
        if g.location_probability > 0.0 && self.governorates.is_empty() {
            return Err(config_error(
                "governorates are required when location_probability > 0",
            ));
        }
        if g.sentiment_min > g.sentiment_max || g.sentiment_min < -1.0 || g.sentiment_max > 1.0 {
            return Err(config_error(format!(
                "sentiment range [{}, {}] must be ordered and within [-1, 1]",
                g.sentiment_min, g.sentiment_max
            )));
        }
        Ok(())
    }

    pub fn operator_ids(&self) -> impl Iterator<Item = &str> {
        self.operators.iter().map(|op| op.id.as_str())
    }

    pub fn category(&self, id: &str) -> Option<&ComplaintCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Hardcoded defaults matching the shipped data/ directory.
    /// Used by tests and by the runner when no data directory is given.
    pub fn builtin() -> Self {
        let operators = [
            ("vodafone", "#E60000", 0.40),
            ("orange", "#FF6600", 0.35),
            ("etisalat", "#00A1E9", 0.15),
            ("we", "#800080", 0.10),
        ]
        .into_iter()
        .map(|(id, color, market_share)| OperatorConfig {
            id: id.into(),
            color: color.into(),
            market_share,
        })
        .collect();

        let categories = vec![
            category(
                "internet",
                &[
                    "الإنترنت بطيء جداً في {location} منذ ٣ أيام",
                    "Slow internet in {location}, can't even browse",
                    "مشكلة في النت في منطقة {location}",
                    "Internet keeps disconnecting in {location}",
                    "سرعة النت سيئة اليوم في {location}",
                ],
            ),
            category(
                "network",
                &[
                    "الإشارة ضعيفة في {location}",
                    "No network coverage in {location} area",
                    "مشكلة في الشبكة في {location}",
                    "Network keeps dropping in {location}",
                    "لا يوجد إشارة في الطابق السفلي في {location}",
                ],
            ),
            category(
                "billing",
                &[
                    "الفاتورة غير صحيحة هذا الشهر",
                    "Incorrect charges on my bill",
                    "خصم مبلغ غير صحيح من رصيدي",
                    "Bill amount is wrong this month",
                    "فاتورتي أعلى من المعتاد بدون سبب",
                ],
            ),
            category(
                "balance",
                &[
                    "الرصيد ينتهي بسرعة كبيرة",
                    "My balance finishes too fast",
                    "مشكلة في شحن الرصيد",
                    "Balance deduction is too quick",
                    "رصيدي انتهى فجأة",
                ],
            ),
            category(
                "customer_service",
                &[
                    "خدمة العملاء لا ترد على الاتصالات",
                    "Customer service not answering",
                    "لا يوجد رد من خدمة العملاء",
                    "Waiting 30 minutes for customer service",
                    "خدمة العملاء سيئة جداً",
                ],
            ),
            category(
                "calls",
                &[
                    "المكالمات تنقطع فجأة",
                    "Calls dropping frequently",
                    "مشكلة في إجراء المكالمات",
                    "Can't make calls, network busy",
                    "جودة المكالمات سيئة",
                ],
            ),
        ];

        let governorates = [
            "Cairo", "Giza", "Alexandria", "Qalyubia", "Port Said", "Suez", "Dakahlia", "Sharqia",
            "Monufia", "Gharbia", "Beheira", "Ismailia", "Faiyum", "Beni Suef", "Minya", "Asyut",
            "Sohag", "Qena", "Luxor", "Aswan",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            operators,
            categories,
            governorates,
            generator: GeneratorSettings::default(),
        }
    }
}

fn category(id: &str, templates: &[&str]) -> ComplaintCategory {
    ComplaintCategory {
        id: id.into(),
        templates: templates.iter().map(|t| t.to_string()).collect(),
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn config_error(reason: impl Into<String>) -> PulseError {
    PulseError::Config {
        reason: reason.into(),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> PulseResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| PulseError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}
