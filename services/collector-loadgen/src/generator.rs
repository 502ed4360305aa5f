use rand::Rng;
use serde_json::json;
use sf_api_types::IncomingEvent;
use uuid::Uuid;

/// Event types with the actions each one may carry.
pub(crate) const EVENT_KINDS: &[(&str, &[&str])] = &[
    ("click", &["submit", "link", "image", "button"]),
    ("page_view", &["load", "unload"]),
    ("add_to_cart", &["product_card", "quick_add"]),
    ("purchase", &["checkout_complete", "paypal"]),
    ("scroll", &["page_bottom", "element_visible"]),
];

pub(crate) fn random_event<R: Rng>(rng: &mut R) -> IncomingEvent {
    let (event_type, actions) = EVENT_KINDS[rng.gen_range(0..EVENT_KINDS.len())];
    let action = actions[rng.gen_range(0..actions.len())];

    let info = match event_type {
        "click" => json!({
            "element_id": format!("btn-{}", rng.gen_range(1..100)),
            "target_url": format!("/path/{}", Uuid::new_v4()),
        }),
        "page_view" => json!({
            "url": format!("/page/{}", Uuid::new_v4()),
            "referrer": format!("https://referrer{}.com", rng.gen_range(1..5)),
        }),
        "add_to_cart" => json!({
            "product_id": format!("prod-{}", rng.gen_range(1000..2000)),
            "quantity": rng.gen_range(1..5),
            "price": rng.gen_range(1.0..100.0),
        }),
        "purchase" => json!({
            "order_id": Uuid::new_v4().to_string(),
            "total_value": rng.gen_range(10.0..500.0),
            "currency": "USD",
        }),
        _ => json!({ "scroll_depth_percent": rng.gen_range(1..100) }),
    };

    IncomingEvent {
        user_id: rng.gen_range(1..1_000_000_000),
        event_type: event_type.to_owned(),
        action: action.to_owned(),
        info,
    }
}
