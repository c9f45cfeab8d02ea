use crate::components::ui::{Button, ButtonSize, ButtonVariant, Card, CardContent, CardHeader, CardTitle};
use crate::models::{Center, DEFAULT_IMAGE_URL};
use crate::state::AppContext;
use icons::ChevronRight;
use leptos::prelude::*;

fn rating_label(c: &Center) -> String {
    if c.reviews == 0 {
        "No reviews yet".to_string()
    } else {
        format!("★ {:.1} ({} reviews)", c.rating, c.reviews)
    }
}

/// Heart toggle. Signed-out users get the "sign in" notice from the
/// synchronizer instead of a state change.
#[component]
pub fn FavoriteButton(#[prop(into)] center_id: String) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let id = StoredValue::new(center_id);

    let is_favorite = move || app_state.0.favorites.with(|f| id.with_value(|i| f.is_favorite(i)));
    let is_pending = move || app_state.0.favorites.with(|f| id.with_value(|i| f.is_pending(i)));

    view! {
        <Button
            variant=ButtonVariant::Favorite
            size=ButtonSize::Sm
            attr:disabled=is_pending
            attr:aria-pressed=move || if is_favorite() { "true" } else { "false" }
            on:click=move |ev: web_sys::MouseEvent| {
                ev.prevent_default();
                ev.stop_propagation();
                app_state.0.toggle_favorite(id.get_value());
            }
        >
            {move || if is_favorite() { "♥ Saved" } else { "♡ Save" }}
        </Button>
    }
}

#[component]
pub fn CenterCard(center: Center) -> impl IntoView {
    let href = format!("/centers/{}", urlencoding::encode(&center.id));
    let image = if center.image_url.trim().is_empty() {
        DEFAULT_IMAGE_URL.to_string()
    } else {
        center.image_url.clone()
    };
    let rating = rating_label(&center);
    let location = center.location_line();
    let amenities: Vec<String> = center.amenities.iter().take(4).cloned().collect();
    let more = center.amenities.len().saturating_sub(amenities.len());

    view! {
        <Card class="overflow-hidden pt-0">
            <img src=image alt=center.name.clone() class="h-40 w-full object-cover" loading="lazy" />
            <CardHeader>
                <CardTitle class="text-base">{center.name.clone()}</CardTitle>
                <p class="text-xs text-muted-foreground">{location}</p>
                <p class="text-xs text-amber-600">{rating}</p>
            </CardHeader>
            <CardContent class="space-y-3">
                <div class="flex flex-wrap gap-1">
                    {amenities
                        .into_iter()
                        .map(|a| view! { <span class="rounded-full bg-muted px-2 py-0.5 text-[11px]">{a}</span> })
                        .collect_view()}
                    {(more > 0).then(|| view! {
                        <span class="px-1 text-[11px] text-muted-foreground">{format!("+{more} more")}</span>
                    })}
                </div>
                <div class="flex items-center justify-between">
                    <FavoriteButton center_id=center.id.clone() />
                    <a href=href class="inline-flex items-center gap-1 text-xs text-primary hover:underline">
                        "Details"
                        <ChevronRight class="size-3" />
                    </a>
                </div>
            </CardContent>
        </Card>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::center;

    #[test]
    fn test_rating_label() {
        let mut c = center("a", "Oakridge", "Portland", &[]);
        assert_eq!(rating_label(&c), "★ 4.5 (10 reviews)");
        c.reviews = 0;
        assert_eq!(rating_label(&c), "No reviews yet");
    }
}
