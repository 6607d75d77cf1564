//! Demo catalog seeding.

use rust_decimal::Decimal;

use crate::domain::product::{Category, NewProduct, Size};
use crate::error::Result;
use crate::store::Store;

/// Replaces the catalog with the 21-product demo set.
pub async fn run(store: &dyn Store) -> Result<usize> {
    store.clear_products().await?;
    let products = demo_products();
    let count = products.len();
    for product in products {
        store.insert_product(product).await?;
    }
    Ok(count)
}

fn product(
    name: &str,
    description: &str,
    price: Decimal,
    image: &str,
    category: Category,
    sizes: &[Size],
    stock: i32,
) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: description.to_string(),
        price,
        image: image.to_string(),
        category,
        sizes: sizes.to_vec(),
        stock,
    }
}

pub fn demo_products() -> Vec<NewProduct> {
    use Category::{Accessories, Kids, Men, Women};
    use Size::{Os, L, M, S, W28, W30, W32, W34, W36, Xl, Xs, Xxl};

    vec![
        product(
            "Classic White T-Shirt",
            "Comfortable cotton t-shirt perfect for everyday wear",
            Decimal::new(1999, 2),
            "https://images.unsplash.com/photo-1521572163474-6864f9cf17ab?w=500",
            Men,
            &[S, M, L, Xl],
            50,
        ),
        product(
            "Denim Jacket",
            "Classic denim jacket with modern fit",
            Decimal::new(8999, 2),
            "https://images.unsplash.com/photo-1594634319156-319c9a82198f?w=500",
            Men,
            &[S, M, L, Xl, Xxl],
            30,
        ),
        product(
            "Black Hoodie",
            "Cozy hoodie perfect for cold weather",
            Decimal::new(4999, 2),
            "https://images.unsplash.com/photo-1556821840-3a63f9560941?w=500",
            Men,
            &[S, M, L, Xl, Xxl],
            40,
        ),
        product(
            "Slim Fit Jeans",
            "Modern slim fit jeans with stretch",
            Decimal::new(6999, 2),
            "https://images.unsplash.com/photo-1542272604-787c3835535d?w=500",
            Men,
            &[W28, W30, W32, W34, W36],
            35,
        ),
        product(
            "Summer Dress",
            "Light and breezy summer dress",
            Decimal::new(5999, 2),
            "https://images.unsplash.com/photo-1539008835657-9e8e9680c956?w=500",
            Women,
            &[Xs, S, M, L, Xl],
            25,
        ),
        product(
            "Women's Blazer",
            "Professional blazer for business casual",
            Decimal::new(11999, 2),
            "https://images.unsplash.com/photo-1594634319156-319c9a82198f?w=500",
            Women,
            &[Xs, S, M, L, Xl],
            20,
        ),
        product(
            "Yoga Leggings",
            "High-waisted leggings perfect for workout",
            Decimal::new(3999, 2),
            "https://images.unsplash.com/photo-1571019613454-1cb2f99b2d8b?w=500",
            Women,
            &[Xs, S, M, L, Xl],
            45,
        ),
        product(
            "Kids Rainbow T-Shirt",
            "Colorful t-shirt for kids",
            Decimal::new(1599, 2),
            "https://images.unsplash.com/photo-1516478177764-9fe5ae0e4443?w=500",
            Kids,
            &[Xs, S, M, L],
            60,
        ),
        product(
            "Kids Denim Shorts",
            "Comfortable denim shorts for active kids",
            Decimal::new(2499, 2),
            "https://images.unsplash.com/photo-1541099649105-f69ad21f3246?w=500",
            Kids,
            &[Xs, S, M, L],
            40,
        ),
        product(
            "Baseball Cap",
            "Classic baseball cap with adjustable strap",
            Decimal::new(1999, 2),
            "https://images.unsplash.com/photo-1521319422675-83cb779e0c69?w=500",
            Accessories,
            &[Os],
            100,
        ),
        product(
            "Leather Belt",
            "Genuine leather belt with classic buckle",
            Decimal::new(3499, 2),
            "https://images.unsplash.com/photo-1549298916-b41d501d3772?w=500",
            Accessories,
            &[S, M, L],
            50,
        ),
        product(
            "Wool Scarf",
            "Warm wool scarf for winter",
            Decimal::new(2999, 2),
            "https://images.unsplash.com/photo-1549298916-b41d501d3772?w=500",
            Accessories,
            &[Os],
            30,
        ),
        product(
            "Polo Shirt",
            "Classic polo shirt for casual wear",
            Decimal::new(3499, 2),
            "https://images.unsplash.com/photo-1596755094514-f87e34085b2c?w=500",
            Men,
            &[S, M, L, Xl],
            35,
        ),
        product(
            "Winter Coat",
            "Warm winter coat with hood",
            Decimal::new(14999, 2),
            "https://images.unsplash.com/photo-1549298916-b41d501d3772?w=500",
            Women,
            &[Xs, S, M, L, Xl],
            25,
        ),
        product(
            "Kids Hoodie",
            "Cozy hoodie for kids",
            Decimal::new(2999, 2),
            "https://images.unsplash.com/photo-1556821840-3a63f9560941?w=500",
            Kids,
            &[Xs, S, M, L],
            45,
        ),
        product(
            "Sunglasses",
            "Stylish sunglasses with UV protection",
            Decimal::new(2499, 2),
            "https://images.unsplash.com/photo-1473496169904-658ba7c44d8f?w=500",
            Accessories,
            &[Os],
            80,
        ),
        product(
            "Backpack",
            "Durable backpack for school or travel",
            Decimal::new(4499, 2),
            "https://images.unsplash.com/photo-1553062407-98eeb64c6a62?w=500",
            Accessories,
            &[Os],
            35,
        ),
        product(
            "Women's Top",
            "Casual top perfect for everyday wear",
            Decimal::new(2999, 2),
            "https://images.unsplash.com/photo-1434389677669-e08b4cac3105?w=500",
            Women,
            &[Xs, S, M, L, Xl],
            40,
        ),
        product(
            "Men's Shorts",
            "Comfortable shorts for summer",
            Decimal::new(3299, 2),
            "https://images.unsplash.com/photo-1594634319156-319c9a82198f?w=500",
            Men,
            &[S, M, L, Xl],
            30,
        ),
        product(
            "Kids T-Shirt Set",
            "Pack of 3 colorful t-shirts for kids",
            Decimal::new(3499, 2),
            "https://images.unsplash.com/photo-1516478177764-9fe5ae0e4443?w=500",
            Kids,
            &[Xs, S, M, L],
            25,
        ),
        product(
            "Wrist Watch",
            "Classic analog watch",
            Decimal::new(7999, 2),
            "https://images.unsplash.com/photo-1523275335684-37898b6baf30?w=500",
            Accessories,
            &[Os],
            40,
        ),
    ]
}
