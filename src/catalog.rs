use lazy_static::lazy_static;

use crate::types::Product;

pub const ALL_CATEGORIES: &str = "All";

lazy_static! {
    static ref PRODUCTS: Vec<Product> = vec![
        product(1, "Neo-Glider X1", "Hover Tech",
            "The latest in personal levitation technology. Smooth ride, silent motor, and neon underglow included.", 4.8),
        product(2, "CyberVisor Pro", "Wearables",
            "Augmented reality interface with neural linking capabilities. Stay connected without lifting a finger.", 4.5),
        product(3, "Quantum Core Desktop", "Computing",
            "Processing power that defies physics. Perfect for rendering the metaverse in real-time.", 5.0),
        product(4, "Sonic Pulse Speakers", "Audio",
            "Feel the bass in your bones with our patented sonic pulse technology. 360-degree immersive audio.", 4.2),
        product(5, "Holo-Watch Series 7", "Wearables",
            "A holographic display on your wrist. Tracks health, messages, and projects 3D maps.", 4.7),
        product(6, "Lumina Smart Lamp", "Home",
            "Mood lighting controlled by your thoughts (via neural link app). Millions of colors to choose from.", 4.3),
    ];

    static ref CATEGORIES: Vec<&'static str> =
        vec![ALL_CATEGORIES, "Hover Tech", "Wearables", "Computing", "Audio", "Home"];
}

fn product(id: u32, name: &str, category: &str, description: &str, rating: f32) -> Product {
    Product {
        id,
        name: name.to_string(),
        price: 1.50,
        category: category.to_string(),
        image: format!("https://picsum.photos/400/400?random={}", id),
        description: description.to_string(),
        rating,
    }
}

pub fn products() -> &'static [Product] {
    &PRODUCTS
}

/// Category names for the filter bar, `All` first.
pub fn categories() -> &'static [&'static str] {
    &CATEGORIES
}

pub fn find(id: u32) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}

/// Products shown on the landing page.
pub fn featured() -> &'static [Product] {
    &PRODUCTS[..3.min(PRODUCTS.len())]
}

/// Products in `category` (or any, for `All`) whose name contains `search`, ignoring case.
pub fn filter(category: &str, search: &str) -> Vec<&'static Product> {
    let needle = search.to_lowercase();
    PRODUCTS
        .iter()
        .filter(|p| category == ALL_CATEGORIES || p.category == category)
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find() {
        assert_eq!(find(3).map(|p| p.name.as_str()), Some("Quantum Core Desktop"));
        assert!(find(42).is_none());
    }

    #[test]
    fn test_filter_by_category() {
        let wearables: Vec<u32> = filter("Wearables", "").iter().map(|p| p.id).collect();
        assert_eq!(wearables, vec![2, 5]);
        assert_eq!(filter(ALL_CATEGORIES, "").len(), products().len());
        assert!(filter("Garden", "").is_empty());
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let hits: Vec<u32> = filter(ALL_CATEGORIES, "pro").iter().map(|p| p.id).collect();
        assert_eq!(hits, vec![2]);
        assert!(filter("Audio", "lamp").is_empty());
    }

    #[test]
    fn test_featured_and_categories() {
        assert_eq!(featured().len(), 3);
        assert_eq!(categories()[0], ALL_CATEGORIES);
        for p in products() {
            assert!(categories().contains(&p.category.as_str()));
        }
    }
}
