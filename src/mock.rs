//! In-memory mock backend
//!
//! Serves the whole REST surface from fixtures and in-memory state, for
//! mock mode and for tests. Behavior mirrors the real backend: the CSRF
//! cookie is issued by the schema endpoint and required on every mutating
//! call, carts merge repeated products and recompute totals, placing an
//! order clears the cart, and profiles are created lazily per email.
//!
//! Every request is recorded so tests can assert call counts.

use crate::error::ApiResult;
use crate::resources::auth::{Profile, ProfileUpdate, User};
use crate::resources::cart::{Cart, CartItem};
use crate::resources::catalog::{Category, Product};
use crate::resources::content::{SustainableGiftingItem, TextTestimonial, VideoTestimonial};
use crate::resources::orders::{Order, OrderStatus, PlaceOrderRequest, ShippingAddress};
use crate::resources::payments::{PaymentOrder, PaymentProvider};
use crate::transport::{Backend, BoxFuture, Method, WireRequest, WireResponse};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const MOCK_CSRF_TOKEN: &str = "mock-csrf-token";
const MOCK_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

/// Fixture-backed [`Backend`] implementation.
pub struct MockBackend {
    products: Vec<Product>,
    cart: Mutex<Cart>,
    orders: Mutex<Vec<Order>>,
    session: Mutex<Option<User>>,
    profiles: Mutex<HashMap<String, Profile>>,
    csrf_issued: AtomicBool,
    requests: Mutex<Vec<(String, String)>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            products: product_fixtures(),
            cart: Mutex::new(Cart {
                items: Vec::new(),
                total: 0,
            }),
            orders: Mutex::new(Vec::new()),
            session: Mutex::new(None),
            profiles: Mutex::new(HashMap::new()),
            csrf_issued: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far, as `(method, path)` pairs.
    pub fn request_log(&self) -> Vec<(String, String)> {
        lock(&self.requests).clone()
    }

    /// How many requests have hit `path`.
    pub fn calls_to(&self, path: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|(_, seen)| seen == path)
            .count()
    }

    fn handle(&self, request: WireRequest) -> WireResponse {
        lock(&self.requests).push((request.method.to_string(), request.path.clone()));

        if request.method.is_mutating()
            && request.csrf_token.as_deref() != Some(MOCK_CSRF_TOKEN)
        {
            return WireResponse::json(
                403,
                json!({"detail": "CSRF Failed: CSRF token missing or incorrect."}),
            );
        }

        let path = request.path.trim_matches('/').to_string();
        let segments: Vec<&str> = path.split('/').collect();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["schema"]) => {
                self.csrf_issued.store(true, Ordering::SeqCst);
                WireResponse::json(200, json!({}))
            }

            (Method::Get, ["products"]) => self.list_products(&request.query),
            (Method::Get, ["products", slug]) => self.get_product(slug),

            (Method::Get, ["cart"]) => WireResponse::json(200, to_json(&*lock(&self.cart))),
            (Method::Post, ["cart"]) => self.add_to_cart(request.body),
            (Method::Put, ["cart", item_id]) => self.update_cart_item(item_id, request.body),
            (Method::Delete, ["cart", item_id, "delete"]) => self.remove_cart_item(item_id),

            (Method::Get, ["orders"]) => WireResponse::json(200, to_json(&*lock(&self.orders))),
            (Method::Post, ["orders"]) => self.place_order(request.body),

            (Method::Post, ["auth", "login"]) => self.login(request.body),
            (Method::Post, ["auth", "signup"]) => self.signup(request.body),
            (Method::Post, ["auth", "logout"]) => {
                *lock(&self.session) = None;
                WireResponse::empty(204)
            }
            (Method::Get, ["auth", "me"]) => match lock(&self.session).clone() {
                Some(user) => WireResponse::json(200, to_json(&user)),
                None => unauthenticated(),
            },
            (Method::Get, ["auth", "profile"]) => self.get_profile(),
            (Method::Put, ["auth", "profile"]) => self.update_profile(request.body),

            (Method::Post, ["payments", "create-order"]) => self.create_payment_order(request.body),

            (Method::Get, ["content", "testimonials", "text"]) => {
                WireResponse::json(200, to_json(&text_testimonial_fixtures()))
            }
            (Method::Get, ["content", "testimonials", "video"]) => {
                WireResponse::json(200, to_json(&video_testimonial_fixtures()))
            }
            (Method::Get, ["content", "sustainable-gifting"]) => {
                WireResponse::json(200, to_json(&gifting_fixtures()))
            }

            _ => WireResponse::json(404, json!({"detail": "Not found."})),
        }
    }

    fn list_products(&self, query: &[(String, String)]) -> WireResponse {
        let mut products: Vec<Product> = self.products.clone();
        for (name, value) in query {
            match name.as_str() {
                "category" => products.retain(|p| p.category.as_str() == value),
                "tag" => products.retain(|p| p.tags.iter().any(|t| t == value)),
                "search" => {
                    let needle = value.to_lowercase();
                    products.retain(|p| {
                        p.name.to_lowercase().contains(&needle)
                            || p.description.to_lowercase().contains(&needle)
                    });
                }
                "sort" => match value.as_str() {
                    "price_asc" => products.sort_by_key(|p| p.price),
                    "price_desc" => products.sort_by_key(|p| std::cmp::Reverse(p.price)),
                    "name" => products.sort_by(|a, b| a.name.cmp(&b.name)),
                    _ => {}
                },
                _ => {}
            }
        }
        WireResponse::json(200, to_json(&products))
    }

    fn get_product(&self, slug: &str) -> WireResponse {
        match self.products.iter().find(|p| p.slug == slug) {
            Some(product) => WireResponse::json(200, to_json(product)),
            None => WireResponse::json(404, json!({"error": "Product not found"})),
        }
    }

    fn add_to_cart(&self, body: Option<Value>) -> WireResponse {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct AddItem {
            product_id: String,
            quantity: u32,
        }

        let input: AddItem = match parse_body(body) {
            Ok(input) => input,
            Err(response) => return response,
        };
        if input.product_id.is_empty() || input.quantity == 0 {
            return WireResponse::json(
                400,
                json!({"error": "Invalid request. productId and quantity (positive number) are required."}),
            );
        }
        let Some(product) = self.products.iter().find(|p| p.id == input.product_id) else {
            return WireResponse::json(404, json!({"error": "Product not found"}));
        };

        let mut cart = lock(&self.cart);
        let item = match cart
            .items
            .iter_mut()
            .find(|item| item.product.id == input.product_id)
        {
            Some(existing) => {
                existing.quantity += input.quantity;
                existing.line_total = existing.product.price * u64::from(existing.quantity);
                existing.clone()
            }
            None => {
                let item = CartItem {
                    id: format!("cart-item-{}", Uuid::now_v7()),
                    product: product.clone(),
                    quantity: input.quantity,
                    line_total: product.price * u64::from(input.quantity),
                };
                cart.items.push(item.clone());
                item
            }
        };
        cart.total = cart.items.iter().map(|item| item.line_total).sum();
        WireResponse::json(201, to_json(&item))
    }

    fn update_cart_item(&self, item_id: &str, body: Option<Value>) -> WireResponse {
        #[derive(Deserialize)]
        struct UpdateItem {
            quantity: u32,
        }

        let input: UpdateItem = match parse_body(body) {
            Ok(input) => input,
            Err(response) => return response,
        };
        if input.quantity == 0 {
            return WireResponse::json(
                400,
                json!({"quantity": ["Quantity must be greater than 0."]}),
            );
        }

        let mut cart = lock(&self.cart);
        let Some(item) = cart.items.iter_mut().find(|item| item.id == item_id) else {
            return WireResponse::json(404, json!({"error": "Cart item not found"}));
        };
        item.quantity = input.quantity;
        item.line_total = item.product.price * u64::from(input.quantity);
        let updated = item.clone();
        cart.total = cart.items.iter().map(|item| item.line_total).sum();
        WireResponse::json(200, to_json(&updated))
    }

    fn remove_cart_item(&self, item_id: &str) -> WireResponse {
        let mut cart = lock(&self.cart);
        cart.items.retain(|item| item.id != item_id);
        cart.total = cart.items.iter().map(|item| item.line_total).sum();
        WireResponse::json(200, json!({"success": true}))
    }

    fn place_order(&self, body: Option<Value>) -> WireResponse {
        let input: PlaceOrderRequest = match parse_body(body) {
            Ok(input) => input,
            Err(response) => return response,
        };
        if input.items.is_empty() {
            return WireResponse::json(
                400,
                json!({"error": "Order must contain at least one item."}),
            );
        }

        let mut items = Vec::new();
        for line in &input.items {
            let Some(product) = self.products.iter().find(|p| p.id == line.product_id) else {
                return WireResponse::json(404, json!({"error": "Product not found"}));
            };
            items.push(CartItem {
                id: format!("order-item-{}", Uuid::now_v7()),
                product: product.clone(),
                quantity: line.quantity,
                line_total: product.price * u64::from(line.quantity),
            });
        }

        let order = Order {
            id: format!("order-{}", Uuid::now_v7()),
            total: items.iter().map(|item| item.line_total).sum(),
            items,
            status: OrderStatus::Placed,
            created_at: MOCK_TIMESTAMP.to_string(),
        };
        lock(&self.orders).push(order.clone());

        // A placed order consumes the cart.
        let mut cart = lock(&self.cart);
        cart.items.clear();
        cart.total = 0;

        WireResponse::json(201, to_json(&order))
    }

    fn login(&self, body: Option<Value>) -> WireResponse {
        #[derive(Deserialize)]
        struct Login {
            email: String,
            password: String,
        }

        let input: Login = match parse_body(body) {
            Ok(input) => input,
            Err(response) => return response,
        };
        if input.email.is_empty() || input.password.is_empty() {
            return WireResponse::json(400, json!({"error": "Email and password are required."}));
        }

        let user = User {
            id: format!("user-{}", Uuid::now_v7()),
            name: local_part(&input.email),
            email: input.email,
        };
        *lock(&self.session) = Some(user.clone());
        WireResponse::json(200, to_json(&user))
    }

    fn signup(&self, body: Option<Value>) -> WireResponse {
        #[derive(Deserialize)]
        struct Signup {
            email: String,
            password: String,
            name: String,
        }

        let input: Signup = match parse_body(body) {
            Ok(input) => input,
            Err(response) => return response,
        };
        if input.email.is_empty() || input.password.is_empty() {
            return WireResponse::json(400, json!({"error": "Email and password are required."}));
        }

        let user = User {
            id: format!("user-{}", Uuid::now_v7()),
            name: if input.name.is_empty() {
                local_part(&input.email)
            } else {
                input.name
            },
            email: input.email,
        };
        *lock(&self.session) = Some(user.clone());
        WireResponse::json(201, to_json(&user))
    }

    fn get_profile(&self) -> WireResponse {
        let Some(user) = lock(&self.session).clone() else {
            return unauthenticated();
        };
        let mut profiles = lock(&self.profiles);
        let profile = profiles
            .entry(user.email.clone())
            .or_insert_with(|| default_profile(&user.email));
        WireResponse::json(200, to_json(profile))
    }

    fn update_profile(&self, body: Option<Value>) -> WireResponse {
        let Some(user) = lock(&self.session).clone() else {
            return unauthenticated();
        };
        let update: ProfileUpdate = match parse_body(body) {
            Ok(update) => update,
            Err(response) => return response,
        };

        let mut profiles = lock(&self.profiles);
        let profile = profiles
            .entry(user.email.clone())
            .or_insert_with(|| default_profile(&user.email));
        if let Some(name) = update.name {
            profile.name = name;
        }
        if let Some(phone) = update.phone {
            profile.phone = phone;
        }
        if let Some(address) = update.shipping_address {
            profile.shipping_address = address;
        }
        // The profile email always follows the session.
        profile.email = user.email.clone();
        WireResponse::json(200, to_json(profile))
    }

    fn create_payment_order(&self, body: Option<Value>) -> WireResponse {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct CreateOrder {
            amount: u64,
            currency: String,
        }

        let input: CreateOrder = match parse_body(body) {
            Ok(input) => input,
            Err(response) => return response,
        };
        let order = PaymentOrder {
            payment_order_id: format!("pay_{}", Uuid::now_v7()),
            provider: PaymentProvider::Razorpay,
            amount: input.amount,
            currency: input.currency,
        };
        WireResponse::json(201, to_json(&order))
    }
}

impl Backend for MockBackend {
    fn execute<'a>(&'a self, request: WireRequest) -> BoxFuture<'a, ApiResult<WireResponse>> {
        Box::pin(async move { Ok(self.handle(request)) })
    }

    fn csrf_token(&self) -> Option<String> {
        self.csrf_issued
            .load(Ordering::SeqCst)
            .then(|| MOCK_CSRF_TOKEN.to_string())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

fn parse_body<T: DeserializeOwned>(body: Option<Value>) -> Result<T, WireResponse> {
    serde_json::from_value(body.unwrap_or(Value::Null))
        .map_err(|_| WireResponse::json(400, json!({"error": "Invalid request body."})))
}

fn unauthenticated() -> WireResponse {
    WireResponse::json(
        401,
        json!({"detail": "Authentication credentials were not provided."}),
    )
}

fn local_part(email: &str) -> String {
    email.split('@').next().unwrap_or("User").to_string()
}

fn default_profile(email: &str) -> Profile {
    Profile {
        name: local_part(email),
        email: email.to_string(),
        phone: String::new(),
        shipping_address: ShippingAddress {
            street: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            country: "India".to_string(),
        },
    }
}

fn product(
    id: &str,
    slug: &str,
    name: &str,
    price: u64,
    category: Category,
    tags: &[&str],
    weight_grams: u32,
) -> Product {
    Product {
        id: id.to_string(),
        slug: slug.to_string(),
        name: name.to_string(),
        description: format!("{name}, handcrafted with organic ingredients."),
        price,
        currency: "INR".to_string(),
        category,
        images: vec![format!("https://images.example.com/{slug}.jpg")],
        tags: tags.iter().map(|t| t.to_string()).collect(),
        is_available: true,
        weight_grams: Some(weight_grams),
    }
}

fn product_fixtures() -> Vec<Product> {
    vec![
        product(
            "1",
            "organic-chocolate-hamper",
            "Organic Chocolate Gift Hamper",
            2499,
            Category::Hamper,
            &["organic", "artisan", "eco-friendly"],
            500,
        ),
        product(
            "2",
            "sugar-free-dessert-collection",
            "Sugar-Free Dessert Collection",
            1899,
            Category::Sweet,
            &["sugar-free", "organic", "guilt-free"],
            750,
        ),
        product(
            "3",
            "artisan-cookie-box",
            "Artisan Cookie Box",
            1299,
            Category::Cookie,
            &["artisan", "organic"],
            400,
        ),
        product(
            "4",
            "healthy-snack-hamper",
            "Healthy Snack Hamper",
            1599,
            Category::Hamper,
            &["organic", "guilt-free"],
            600,
        ),
        product(
            "5",
            "premium-cake-collection",
            "Premium Cake Collection",
            2199,
            Category::Cake,
            &["sugar-free", "artisan"],
            1000,
        ),
        product(
            "6",
            "eco-luxury-gift-hamper",
            "Eco Luxury Gift Hamper",
            3499,
            Category::Hamper,
            &["organic", "eco-friendly"],
            1500,
        ),
        product(
            "7",
            "artisan-sweet-box",
            "Artisan Sweet Box",
            999,
            Category::Sweet,
            &["organic", "artisan"],
            450,
        ),
        product(
            "8",
            "gourmet-snack-box",
            "Gourmet Snack Box",
            1199,
            Category::Snack,
            &["guilt-free", "artisan"],
            550,
        ),
    ]
}

fn text_testimonial_fixtures() -> Vec<TextTestimonial> {
    vec![
        TextTestimonial {
            id: "t1".to_string(),
            author: "Priya S.".to_string(),
            quote: "The chocolate hamper was the highlight of our Diwali gifts.".to_string(),
        },
        TextTestimonial {
            id: "t2".to_string(),
            author: "Rahul M.".to_string(),
            quote: "Sugar-free desserts that actually taste indulgent.".to_string(),
        },
        TextTestimonial {
            id: "t3".to_string(),
            author: "Anita K.".to_string(),
            quote: "Beautiful packaging, zero plastic. Exactly what we wanted.".to_string(),
        },
    ]
}

fn video_testimonial_fixtures() -> Vec<VideoTestimonial> {
    vec![
        VideoTestimonial {
            id: "v1".to_string(),
            title: "Corporate gifting done right".to_string(),
            video_url: "https://videos.example.com/corporate-gifting.mp4".to_string(),
            thumbnail_url: "https://images.example.com/corporate-gifting.jpg".to_string(),
        },
        VideoTestimonial {
            id: "v2".to_string(),
            title: "A wedding hamper story".to_string(),
            video_url: "https://videos.example.com/wedding-hamper.mp4".to_string(),
            thumbnail_url: "https://images.example.com/wedding-hamper.jpg".to_string(),
        },
    ]
}

fn gifting_fixtures() -> Vec<SustainableGiftingItem> {
    vec![
        SustainableGiftingItem {
            id: "g1".to_string(),
            title: "Reusable packaging".to_string(),
            description: "Every hamper ships in jute and kraft paper.".to_string(),
            image_url: "https://images.example.com/reusable-packaging.jpg".to_string(),
            order: 1,
            is_active: true,
        },
        SustainableGiftingItem {
            id: "g2".to_string(),
            title: "Local artisans".to_string(),
            description: "Sweets and savories made by neighborhood kitchens.".to_string(),
            image_url: "https://images.example.com/local-artisans.jpg".to_string(),
            order: 2,
            is_active: true,
        },
        SustainableGiftingItem {
            id: "g3".to_string(),
            title: "Natural sweeteners".to_string(),
            description: "Dates and jaggery instead of refined sugar.".to_string(),
            image_url: "https://images.example.com/natural-sweeteners.jpg".to_string(),
            order: 3,
            is_active: true,
        },
    ]
}
