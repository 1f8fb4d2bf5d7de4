use chrono::Utc;
use tempfile::TempDir;

use catalogdb_core::seed::SeedBundle;
use catalogdb_core::traits::CatalogStore;
use catalogdb_core::types::{Category, Order, OrderFilter, OrderItem, OrderStatus, Product, ProductFilter, Review};
use catalogdb_core::Error;
use catalogdb_store::JsonCatalog;

fn category(id: &str, parent: Option<&str>) -> Category {
    Category {
        id: id.into(),
        name: format!("Category {id}"),
        description: None,
        parent_id: parent.map(Into::into),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn product(id: &str, category_id: &str, price: f64) -> Product {
    Product {
        id: id.into(),
        name: format!("Product {id}"),
        description: "waterproof hiking boot".into(),
        price,
        category_id: category_id.into(),
        merchant_id: "m1".into(),
        images: vec![format!("https://img.example/{id}.png")],
        stock_quantity: 5,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn review(id: &str, product_id: &str, user_id: &str, rating: u8) -> Review {
    Review {
        id: id.into(),
        product_id: product_id.into(),
        user_id: user_id.into(),
        rating,
        comment: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn bundle() -> SeedBundle {
    SeedBundle {
        categories: vec![category("outdoor", None), category("boots", Some("outdoor"))],
        products: vec![product("p1", "boots", 80.0), product("p2", "outdoor", 20.0), product("p3", "boots", 120.0)],
        reviews: vec![review("r1", "p1", "u1", 5), review("r2", "p1", "u2", 3)],
        orders: vec![],
    }
}

#[test]
fn import_keeps_natural_order_and_aggregates_ratings() -> anyhow::Result<()> {
    let store = JsonCatalog::in_memory();
    let report = store.import(bundle())?;
    assert_eq!((report.categories, report.products, report.reviews), (2, 3, 2));

    let ids: Vec<_> = store.find_products(&ProductFilter::active())?.into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);

    let summary = store.rating_summary("p1")?;
    assert_eq!(summary.average_rating, Some(4.0));
    assert_eq!(summary.review_count, 2);
    let empty = store.rating_summary("p2")?;
    assert_eq!(empty.average_rating, None);
    assert_eq!(empty.review_count, 0);

    let children = store.child_categories(&"outdoor".to_string())?;
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, "boots");
    Ok(())
}

#[test]
fn import_is_all_or_nothing() -> anyhow::Result<()> {
    let store = JsonCatalog::in_memory();
    let mut bad = bundle();
    bad.reviews.push(review("r3", "p1", "u1", 4));
    assert!(store.import(bad).is_err(), "second review by u1 on p1 is rejected");
    assert_eq!(store.counts()?.products, 0);

    let mut bad = bundle();
    bad.products.push(product("p9", "nowhere", 1.0));
    assert!(store.import(bad).is_err());

    let mut bad = bundle();
    bad.reviews[0].rating = 9;
    assert!(store.import(bad).is_err());
    Ok(())
}

#[test]
fn filters_combine_structural_and_text_predicates() -> anyhow::Result<()> {
    let store = JsonCatalog::in_memory();
    store.import(bundle())?;

    let mut filter = ProductFilter::active();
    filter.category_ids = Some(["boots".to_string()].into_iter().collect());
    filter.max_price = Some(100.0);
    let ids: Vec<_> = store.find_products(&filter)?.into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["p1"]);

    let hits = store.find_products(&ProductFilter::active().with_text("HIKING"))?;
    assert_eq!(hits.len(), 3);
    assert!(store.find_products(&ProductFilter::active().with_text("sandal"))?.is_empty());
    Ok(())
}

#[test]
fn writes_persist_to_snapshot_and_reload() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("data/catalog.json");
    {
        let store = JsonCatalog::open(&path)?;
        store.import(bundle())?;
        let mut p2 = store.get_product("p2")?.expect("p2");
        p2.is_active = false;
        store.replace_product(p2)?;
        assert!(store.delete_review(&"r2".to_string())?);
        assert!(!store.delete_review(&"r2".to_string())?);
    }
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let reopened = JsonCatalog::open(&path)?;
    assert_eq!(reopened.counts()?.reviews, 1);
    assert!(!reopened.get_product("p2")?.expect("p2").is_active);
    assert_eq!(reopened.find_products(&ProductFilter::active())?.len(), 2);
    Ok(())
}

#[test]
fn replace_of_unknown_record_fails() {
    let store = JsonCatalog::in_memory();
    assert!(store.replace_category(category("ghost", None)).is_err());
    assert!(store.replace_review(review("r1", "p1", "u1", 4)).is_err());
}

#[test]
fn failed_snapshot_write_leaves_catalog_unchanged() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("catalog.json");
    let store = JsonCatalog::open(&path)?;
    // A directory in the temp file's place makes every snapshot write fail.
    std::fs::create_dir(path.with_extension("json.tmp"))?;

    let seed = SeedBundle { categories: vec![category("c1", None)], ..SeedBundle::default() };
    assert!(store.import(seed).is_err());
    assert!(store.insert_category(category("c2", None)).is_err());
    assert!(store.list_categories(false)?.is_empty());
    assert!(!path.exists());

    std::fs::remove_dir(path.with_extension("json.tmp"))?;
    store.insert_category(category("c3", None))?;
    let ids: Vec<_> = store.list_categories(false)?.into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec!["c3"]);
    assert_eq!(JsonCatalog::open(&path)?.counts()?.categories, 1);
    Ok(())
}

fn order(id: &str, lines: &[(&str, u32)]) -> Order {
    Order {
        id: id.into(),
        user_id: "u1".into(),
        merchant_id: "m1".into(),
        items: lines.iter().map(|(p, q)| OrderItem { product_id: p.to_string(), quantity: *q, price: 1.0 }).collect(),
        total_amount: 1.0,
        status: OrderStatus::Pending,
        shipping_address: "1 Main St".into(),
        contact_phone: "555-0100".into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn place_order_reserves_stock_in_one_write() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("catalog.json");
    let store = JsonCatalog::open(&path)?;
    store.import(bundle())?;

    let err = store.place_order(order("o1", &[("p1", 2), ("p3", 6)])).unwrap_err();
    assert!(matches!(Error::from_store(err), Error::InsufficientStock { available: 5, .. }));
    assert_eq!(store.get_product("p1")?.expect("p1").stock_quantity, 5);
    assert!(store.get_order("o1")?.is_none());

    store.place_order(order("o1", &[("p1", 2), ("p3", 5)]))?;
    assert!(store.place_order(order("o1", &[("p1", 1)])).is_err(), "duplicate id");
    let reopened = JsonCatalog::open(&path)?;
    assert_eq!(reopened.get_product("p1")?.expect("p1").stock_quantity, 3);
    assert_eq!(reopened.get_product("p3")?.expect("p3").stock_quantity, 0);
    assert_eq!(reopened.counts()?.orders, 1);

    let cancelled = reopened.cancel_order("o1")?;
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(reopened.get_product("p3")?.expect("p3").stock_quantity, 5);
    assert!(matches!(Error::from_store(reopened.cancel_order("o1").unwrap_err()), Error::InvalidInput(_)));
    assert!(matches!(Error::from_store(reopened.cancel_order("nope").unwrap_err()), Error::OrderNotFound(_)));
    assert_eq!(reopened.find_orders(&OrderFilter::default())?.len(), 1);
    Ok(())
}

#[test]
fn imported_orders_must_reference_known_products() {
    let store = JsonCatalog::in_memory();
    let mut seed = bundle();
    seed.orders = vec![order("o1", &[("p9", 1)])];
    assert!(store.import(seed).is_err());
    assert_eq!(store.counts().unwrap().products, 0);
}
