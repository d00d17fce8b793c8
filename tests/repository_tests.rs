//! Repository integration tests: tenant scoping, soft deletes and
//! pagination.

use retail_system::{
    error::AppError,
    models::{
        category::CreateCategoryRequest,
        customer::CreateCustomerRequest,
        product::{CreateProductRequest, ProductListQuery},
    },
    repository::{CategoryRepository, CustomerRepository, ProductRepository},
};
use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

mod common;
use common::{create_test_business, setup_test_db};

async fn setup() -> (PgPool, Uuid) {
    let config = common::create_test_config();
    let pool = setup_test_db(&config).await;
    let business_id = create_test_business(&pool, "Repo Test Shop").await;
    (pool, business_id)
}

fn product_request(name: &str, price: f64) -> CreateProductRequest {
    CreateProductRequest {
        name: name.to_string(),
        sku: None,
        barcode: None,
        description: None,
        category_id: None,
        price,
        cost_price: Some(price * 0.5),
        stock_quantity: Some(5),
        min_stock_level: Some(2),
        image_url: None,
    }
}

#[tokio::test]
#[serial]
async fn test_product_create_and_tenant_scoping() {
    let (pool, business_id) = setup().await;
    let other_business = create_test_business(&pool, "Other Shop").await;

    let repo = ProductRepository::new(pool.clone());
    let product = repo
        .create(business_id, &product_request("Espresso Beans", 12.5), "SKU-TEST-1")
        .await
        .unwrap();

    assert_eq!(product.price, 12.5);
    assert_eq!(product.stock_quantity, 5);

    // visible inside the tenant, invisible outside
    assert!(repo.find_by_id(product.id, business_id).await.unwrap().is_some());
    assert!(repo.find_by_id(product.id, other_business).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_product_duplicate_sku_conflicts() {
    let (pool, business_id) = setup().await;
    let repo = ProductRepository::new(pool);

    repo.create(business_id, &product_request("First", 1.0), "SKU-DUP")
        .await
        .unwrap();

    let err = repo
        .create(business_id, &product_request("Second", 2.0), "SKU-DUP")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[serial]
async fn test_product_soft_delete_and_restore() {
    let (pool, business_id) = setup().await;
    let repo = ProductRepository::new(pool);

    let product = repo
        .create(business_id, &product_request("Transient", 3.0), "SKU-TRANS")
        .await
        .unwrap();

    assert!(repo.soft_delete(product.id, business_id).await.unwrap());
    assert!(repo.find_by_id(product.id, business_id).await.unwrap().is_none());

    // deleting again affects nothing
    assert!(!repo.soft_delete(product.id, business_id).await.unwrap());

    assert!(repo.restore(product.id, business_id).await.unwrap());
    assert!(repo.find_by_id(product.id, business_id).await.unwrap().is_some());
}

#[tokio::test]
#[serial]
async fn test_product_list_pagination_and_search() {
    let (pool, business_id) = setup().await;
    let repo = ProductRepository::new(pool);

    for i in 0..5 {
        repo.create(
            business_id,
            &product_request(&format!("Paged Product {}", i), 1.0 + i as f64),
            &format!("SKU-PAGE-{}", i),
        )
        .await
        .unwrap();
    }

    let (page1, total) = repo
        .list(
            business_id,
            &ProductListQuery {
                search: None,
                category_id: None,
                page: 1,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(total, 5);
    assert_eq!(page1.len(), 2);

    let (page3, _) = repo
        .list(
            business_id,
            &ProductListQuery {
                search: None,
                category_id: None,
                page: 3,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page3.len(), 1);

    let (found, found_total) = repo
        .list(
            business_id,
            &ProductListQuery {
                search: Some("Paged Product 3".to_string()),
                category_id: None,
                page: 1,
                limit: 20,
            },
        )
        .await
        .unwrap();
    assert_eq!(found_total, 1);
    assert_eq!(found[0].name, "Paged Product 3");
}

#[test]
fn test_generated_skus_are_distinct() {
    let a = ProductRepository::generate_sku();
    let b = ProductRepository::generate_sku();
    assert_ne!(a, b);
    assert!(a.starts_with("PRD-"));
}

#[tokio::test]
#[serial]
async fn test_category_product_count_guards_delete() {
    let (pool, business_id) = setup().await;
    let categories = CategoryRepository::new(pool.clone());
    let products = ProductRepository::new(pool);

    let category = categories
        .create(
            business_id,
            &CreateCategoryRequest {
                name: "Beverages".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

    let mut req = product_request("Cold Brew", 4.5);
    req.category_id = Some(category.id);
    products.create(business_id, &req, "SKU-CAT-1").await.unwrap();

    assert_eq!(
        categories.product_count(category.id, business_id).await.unwrap(),
        1
    );
}

#[tokio::test]
#[serial]
async fn test_customer_search_matches_name_and_phone() {
    let (pool, business_id) = setup().await;
    let repo = CustomerRepository::new(pool);

    repo.create(
        business_id,
        &CreateCustomerRequest {
            name: "Alice Archer".to_string(),
            phone: Some("555-0101".to_string()),
            email: None,
            address: None,
        },
    )
    .await
    .unwrap();
    repo.create(
        business_id,
        &CreateCustomerRequest {
            name: "Bob Builder".to_string(),
            phone: Some("555-0202".to_string()),
            email: None,
            address: None,
        },
    )
    .await
    .unwrap();

    let by_name = repo.search(business_id, "Alice").await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "Alice Archer");

    let by_phone = repo.search(business_id, "555-02").await.unwrap();
    assert_eq!(by_phone.len(), 1);
    assert_eq!(by_phone[0].name, "Bob Builder");
}

#[tokio::test]
#[serial]
async fn test_loyalty_points_never_go_negative() {
    let (pool, business_id) = setup().await;
    let repo = CustomerRepository::new(pool);

    let customer = repo
        .create(
            business_id,
            &CreateCustomerRequest {
                name: "Points Customer".to_string(),
                phone: None,
                email: None,
                address: None,
            },
        )
        .await
        .unwrap();

    let after_add = repo
        .adjust_loyalty_points(customer.id, business_id, 20)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_add.loyalty_points, 20);

    let after_sub = repo
        .adjust_loyalty_points(customer.id, business_id, -50)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_sub.loyalty_points, 0);
}
