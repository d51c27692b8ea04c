use rust_decimal::Decimal;

use crate::models::ProductDraft;

/// A few products to populate an empty catalog with.
pub fn sample_drafts() -> Vec<ProductDraft> {
    vec![
        ProductDraft::new(
            "Mirrorless Camera",
            "24MP body with a 15-45mm kit lens",
            Decimal::new(64_999, 2),
            "camera",
        ),
        ProductDraft::new(
            "Ultrabook 14",
            "Lightweight laptop, 16GB RAM, 512GB SSD",
            Decimal::new(109_900, 2),
            "laptop",
        ),
        ProductDraft::new(
            "Pocket Phone",
            "Compact smartphone with a 6.1\" display",
            Decimal::new(49_950, 2),
            "smartphone",
        ),
        ProductDraft::new(
            "Travel Tripod",
            "Aluminium tripod, folds to 35cm",
            Decimal::new(3_999, 2),
            "accessory",
        ),
    ]
}
