use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        recipes::{
            CreateRecipeRequest, IngredientAmount, RecipeDetail, RecipeIngredientDto, RecipeList,
            RecipeMinified, ShortLinkResponse, UpdateRecipeRequest,
        },
        users::{
            AvatarRequest, AvatarResponse, SubscriptionEntry, SubscriptionList, UserList,
            UserProfile,
        },
    },
    models::{Ingredient, Tag},
    response::{ApiResponse, Meta},
    routes::{auth, health, ingredients, params, recipes, tags, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        users::list_users,
        users::me,
        users::get_user,
        users::set_avatar,
        users::delete_avatar,
        users::list_subscriptions,
        users::subscribe,
        users::unsubscribe,
        tags::list_tags,
        tags::get_tag,
        ingredients::list_ingredients,
        ingredients::get_ingredient,
        recipes::list_recipes,
        recipes::get_recipe,
        recipes::create_recipe,
        recipes::update_recipe,
        recipes::delete_recipe,
        recipes::add_favorite,
        recipes::remove_favorite,
        recipes::add_to_cart,
        recipes::remove_from_cart,
        recipes::download_shopping_cart,
        recipes::get_link
    ),
    components(
        schemas(
            Tag,
            Ingredient,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UserProfile,
            UserList,
            SubscriptionEntry,
            SubscriptionList,
            AvatarRequest,
            AvatarResponse,
            IngredientAmount,
            CreateRecipeRequest,
            UpdateRecipeRequest,
            RecipeIngredientDto,
            RecipeDetail,
            RecipeList,
            RecipeMinified,
            ShortLinkResponse,
            tags::TagList,
            ingredients::IngredientList,
            ingredients::IngredientQuery,
            params::Pagination,
            params::RecipeListQuery,
            params::SubscriptionQuery,
            Meta,
            ApiResponse<RecipeDetail>,
            ApiResponse<RecipeList>,
            ApiResponse<UserProfile>,
            ApiResponse<SubscriptionList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "User profile endpoints"),
        (name = "Subscriptions", description = "Follow/unfollow authors"),
        (name = "Tags", description = "Tag reference data"),
        (name = "Ingredients", description = "Ingredient reference data"),
        (name = "Recipes", description = "Recipe endpoints"),
        (name = "Favorites", description = "Favorite toggles"),
        (name = "Cart", description = "Shopping cart endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
