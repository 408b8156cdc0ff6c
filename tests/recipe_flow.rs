use foodgram_api::{
    db::{DbPool, create_pool},
    dto::recipes::{CreateRecipeRequest, IngredientAmount, UpdateRecipeRequest},
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::Pagination,
    services::{
        membership_service::{self, MembershipList},
        recipe_service, shopping_list, short_link_service, subscription_service,
    },
};
use uuid::Uuid;

// Integration flow: authors publish recipes, a reader favorites them, fills a
// cart and downloads the aggregated shopping list; covers the toggle, cascade
// and short-link rules along the way.
#[tokio::test]
async fn recipe_cart_and_shopping_list_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let pool = setup_pool(&database_url).await?;

    let author = create_user(&pool, "author@example.com", "author").await?;
    let reader = create_user(&pool, "reader@example.com", "reader").await?;

    let breakfast = create_tag(&pool, "Breakfast", "breakfast").await?;
    let sugar = create_ingredient(&pool, "sugar", "g").await?;
    let flour = create_ingredient(&pool, "flour", "g").await?;

    // Two recipes sharing the sugar ingredient.
    let pancakes = recipe_service::create_recipe(
        &pool,
        &author,
        CreateRecipeRequest {
            name: "Pancakes".into(),
            text: "Mix and fry.".into(),
            cooking_time: 20,
            image: "data:image/png;base64,xyz".into(),
            tags: vec![breakfast],
            ingredients: vec![
                IngredientAmount { id: sugar, amount: 200 },
                IngredientAmount { id: flour, amount: 100 },
            ],
        },
    )
    .await?
    .data
    .unwrap();

    let tea = recipe_service::create_recipe(
        &pool,
        &author,
        CreateRecipeRequest {
            name: "Sweet tea".into(),
            text: "Brew, add sugar.".into(),
            cooking_time: 5,
            image: "data:image/png;base64,xyz".into(),
            tags: vec![breakfast],
            ingredients: vec![IngredientAmount { id: sugar, amount: 50 }],
        },
    )
    .await?
    .data
    .unwrap();

    // Duplicate favorite: first add succeeds, second reports a conflict and
    // the store holds exactly one row.
    let projection =
        membership_service::add_recipe(&pool, MembershipList::Favorites, &reader, pancakes.id)
            .await?;
    assert_eq!(projection.name, "Pancakes");
    let err =
        membership_service::add_recipe(&pool, MembershipList::Favorites, &reader, pancakes.id)
            .await
            .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(
        count(&pool, "favorites", "recipe_id", pancakes.id).await?,
        1
    );

    // Empty cart download is a 400, not an empty file.
    let err = shopping_list::build_report(&pool, &reader).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Aggregation sums per (name, unit) across both cart recipes.
    membership_service::add_recipe(&pool, MembershipList::ShoppingCart, &reader, pancakes.id)
        .await?;
    membership_service::add_recipe(&pool, MembershipList::ShoppingCart, &reader, tea.id).await?;

    let lines = shopping_list::collect_lines(&pool, reader.user_id).await?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].name, "flour");
    assert_eq!(lines[0].total, 100);
    assert_eq!(lines[1].name, "sugar");
    assert_eq!(lines[1].total, 250);

    let (filename, body) = shopping_list::build_report(&pool, &reader).await?;
    assert_eq!(filename, "reader_shopping_list.txt");
    assert!(body.contains("sugar - 250 g"));

    // Update with a duplicate ingredient id fails and leaves the stored
    // ingredient set untouched.
    let before = ingredient_ids(&pool, pancakes.id).await?;
    let err = recipe_service::update_recipe(
        &pool,
        &author,
        pancakes.id,
        UpdateRecipeRequest {
            name: "Pancakes v2".into(),
            text: "Mix and fry.".into(),
            cooking_time: 25,
            image: None,
            tags: vec![breakfast],
            ingredients: vec![
                IngredientAmount { id: sugar, amount: 10 },
                IngredientAmount { id: sugar, amount: 20 },
            ],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation {
            field: "ingredients",
            ..
        }
    ));
    assert_eq!(ingredient_ids(&pool, pancakes.id).await?, before);

    // A blank image in an update payload is rejected like it is on create.
    let err = recipe_service::update_recipe(
        &pool,
        &author,
        pancakes.id,
        UpdateRecipeRequest {
            name: "Pancakes".into(),
            text: "Mix and fry.".into(),
            cooking_time: 20,
            image: Some("   ".into()),
            tags: vec![breakfast],
            ingredients: vec![IngredientAmount { id: sugar, amount: 200 }],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "image", .. }));

    // A non-author cannot edit the recipe.
    let err = recipe_service::delete_recipe(&pool, &reader, pancakes.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // Short-link get-or-create is idempotent.
    let token_a = short_link_service::get_or_create(&pool, pancakes.id).await?;
    let token_b = short_link_service::get_or_create(&pool, pancakes.id).await?;
    assert_eq!(token_a, token_b);
    assert_eq!(
        short_link_service::resolve(&pool, &token_a).await?,
        pancakes.id
    );

    // Self-subscription is rejected regardless of state.
    let err = subscription_service::subscribe(&pool, &reader, reader.user_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "author", .. }));

    // Subscribe to the author; recipes_limit caps the embedded recipe list.
    let entry = subscription_service::subscribe(&pool, &reader, author.user_id, Some(1)).await?;
    assert_eq!(entry.recipes.len(), 1);
    assert_eq!(entry.recipes_count, 2);
    let err = subscription_service::subscribe(&pool, &reader, author.user_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let listed = subscription_service::list_subscriptions(
        &pool,
        &reader,
        Pagination {
            page: Some(1),
            per_page: Some(20),
        },
        None,
    )
    .await?
    .data
    .unwrap();
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].recipes.len(), 2);

    // Deleting the recipe cascades to associations, favorites, cart rows and
    // the short link.
    recipe_service::delete_recipe(&pool, &author, pancakes.id).await?;
    for (table, column) in [
        ("recipe_ingredients", "recipe_id"),
        ("recipe_tags", "recipe_id"),
        ("favorites", "recipe_id"),
        ("shopping_cart", "recipe_id"),
        ("short_links", "recipe_id"),
    ] {
        assert_eq!(
            count(&pool, table, column, pancakes.id).await?,
            0,
            "expected no {table} rows after recipe delete"
        );
    }

    Ok(())
}

async fn setup_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let pool = create_pool(database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE short_links, recipe_ingredients, recipe_tags, favorites, shopping_cart, \
         subscriptions, recipes, ingredients, tags, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

async fn create_user(pool: &DbPool, email: &str, username: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, username, first_name, last_name, password_hash)
        VALUES ($1, $2, $3, $4, $5, 'dummy')
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(username)
    .bind(username)
    .bind("Test")
    .execute(pool)
    .await?;

    Ok(AuthUser {
        user_id: id,
        username: username.to_string(),
        role: "user".to_string(),
    })
}

async fn create_tag(pool: &DbPool, name: &str, slug: &str) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO tags (id, name, slug) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(slug)
        .execute(pool)
        .await?;
    Ok(id)
}

async fn create_ingredient(pool: &DbPool, name: &str, unit: &str) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO ingredients (id, name, measurement_unit) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(unit)
        .execute(pool)
        .await?;
    Ok(id)
}

async fn count(pool: &DbPool, table: &str, column: &str, id: Uuid) -> anyhow::Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} = $1");
    let (n,): (i64,) = sqlx::query_as(&sql).bind(id).fetch_one(pool).await?;
    Ok(n)
}

async fn ingredient_ids(pool: &DbPool, recipe_id: Uuid) -> anyhow::Result<Vec<(Uuid, i32)>> {
    let rows: Vec<(Uuid, i32)> = sqlx::query_as(
        "SELECT ingredient_id, amount FROM recipe_ingredients WHERE recipe_id = $1 ORDER BY ingredient_id",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
