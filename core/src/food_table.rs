use tracing::debug;

use crate::models::IngredientProfile;

/// Built-in per-100 g reference values.
const REFERENCE: &[(&str, f64, f64, f64, f64)] = &[
    // (name, kcal, protein, carbohydrates, fat)
    ("Ức gà", 165.0, 31.0, 0.0, 3.6),
    ("Đùi gà", 209.0, 26.0, 0.0, 10.9),
    ("Thịt bò thăn", 250.0, 26.0, 0.0, 15.0),
    ("Thịt lợn nạc", 242.0, 26.0, 0.0, 14.0),
    ("Cá hồi", 208.0, 20.0, 0.0, 13.0),
    ("Tôm", 99.0, 24.0, 0.2, 0.3),
    ("Trứng", 155.0, 13.0, 1.1, 11.0),
    ("Đậu phụ", 76.0, 8.0, 1.9, 4.8),
    ("Cơm trắng", 130.0, 2.7, 28.0, 0.3),
    ("Gạo lứt", 111.0, 2.6, 23.0, 0.9),
    ("Khoai lang", 86.0, 1.6, 20.0, 0.1),
    ("Bông cải xanh", 55.0, 3.7, 11.2, 0.6),
    ("Rau bina (cải bó xôi)", 23.0, 2.9, 3.6, 0.4),
    ("Cà chua", 18.0, 0.9, 3.9, 0.2),
    ("Dưa chuột", 15.0, 0.7, 3.6, 0.1),
    ("Cà rốt", 41.0, 0.9, 10.0, 0.2),
    ("Dầu ô liu", 884.0, 0.0, 0.0, 100.0),
    ("Bơ (quả)", 160.0, 2.0, 8.5, 15.0),
    ("Sữa tươi", 42.0, 3.4, 5.0, 1.0),
];

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Ingredient lookup: the static reference table plus profiles fetched during
/// this session.
///
/// The session cache is owned by whoever owns the table, so two trackers
/// never share looked-up entries.
#[derive(Debug, Clone)]
pub struct IngredientTable {
    reference: Vec<IngredientProfile>,
    cache: Vec<IngredientProfile>,
}

impl Default for IngredientTable {
    fn default() -> Self {
        Self::new()
    }
}

impl IngredientTable {
    #[must_use]
    pub fn new() -> Self {
        let reference = REFERENCE
            .iter()
            .map(|&(name, calories, protein, carbohydrates, fat)| IngredientProfile {
                name: name.to_string(),
                calories,
                protein,
                carbohydrates,
                fat,
            })
            .collect();
        Self::with_reference(reference)
    }

    #[must_use]
    pub fn with_reference(reference: Vec<IngredientProfile>) -> Self {
        Self {
            reference,
            cache: Vec::new(),
        }
    }

    /// Case-insensitive, trimmed exact match. Session entries shadow the reference table.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&IngredientProfile> {
        let key = normalize(name);
        if key.is_empty() {
            return None;
        }
        self.cache
            .iter()
            .find(|p| normalize(&p.name) == key)
            .or_else(|| self.reference.iter().find(|p| normalize(&p.name) == key))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Cache a looked-up profile. The first profile for a name wins; later ones
    /// are ignored. Returns whether the profile was inserted.
    pub fn add_to_cache(&mut self, profile: IngredientProfile) -> bool {
        let key = normalize(&profile.name);
        if key.is_empty() || self.cache.iter().any(|p| normalize(&p.name) == key) {
            return false;
        }
        debug!(ingredient = %profile.name, "caching ingredient profile");
        self.cache.push(profile);
        true
    }

    #[must_use]
    pub fn reference(&self) -> &[IngredientProfile] {
        &self.reference
    }

    #[must_use]
    pub fn cached(&self) -> &[IngredientProfile] {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, calories: f64) -> IngredientProfile {
        IngredientProfile {
            name: name.to_string(),
            calories,
            protein: 1.0,
            carbohydrates: 2.0,
            fat: 3.0,
        }
    }

    #[test]
    fn test_lookup_reference_case_insensitive() {
        let table = IngredientTable::new();
        let chicken = table.lookup("  ức GÀ ").unwrap();
        assert_eq!(chicken.name, "Ức gà");
        assert!((chicken.calories - 165.0).abs() < f64::EPSILON);
        assert!((chicken.fat - 3.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lookup_missing_and_empty() {
        let table = IngredientTable::new();
        assert!(table.lookup("Dragon fruit").is_none());
        assert!(table.lookup("").is_none());
        assert!(table.lookup("   ").is_none());
    }

    #[test]
    fn test_reference_table_size() {
        assert_eq!(IngredientTable::new().reference().len(), 19);
    }

    #[test]
    fn test_cache_is_checked_first() {
        let mut table = IngredientTable::new();
        assert!(table.add_to_cache(profile("Cơm trắng", 999.0)));
        let rice = table.lookup("cơm trắng").unwrap();
        assert!((rice.calories - 999.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_add_to_cache_first_write_wins() {
        let mut table = IngredientTable::new();
        assert!(table.add_to_cache(profile("Dragon fruit", 60.0)));
        assert!(!table.add_to_cache(profile("DRAGON FRUIT", 80.0)));
        assert!(!table.add_to_cache(profile(" dragon fruit ", 90.0)));
        assert_eq!(table.cached().len(), 1);
        let fruit = table.lookup("dragon fruit").unwrap();
        assert!((fruit.calories - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_add_to_cache_rejects_blank_name() {
        let mut table = IngredientTable::new();
        assert!(!table.add_to_cache(profile("  ", 10.0)));
        assert!(table.cached().is_empty());
    }

    #[test]
    fn test_tables_do_not_share_cache() {
        let mut a = IngredientTable::new();
        let b = IngredientTable::new();
        a.add_to_cache(profile("Jackfruit", 95.0));
        assert!(a.contains("jackfruit"));
        assert!(!b.contains("jackfruit"));
    }
}
