use crate::api::{ApiError, CenterGateway, WriteOutcome};
use crate::components::ui::{
    Alert, AlertDescription, AlertTitle, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardGrid, CardHeader, CardTitle, ErrorBanner, FieldError, Input, Label,
    LoadingBlock, Spinner, TextArea,
};
use crate::components::{CenterCard, FavoriteButton};
use crate::health::LoadTrigger;
use crate::models::{Center, CenterDraft, Coordinates, Program, Weekday, WeeklyHours};
use crate::session::{self, display_name, SessionContext, SignUpResult};
use crate::state::{AppContext, AppState, NoticeKind};
use crate::storage::save_last_query;
use crate::store::{save_center, SavedCenter, SearchSummary};
use icons::X;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::{use_navigate, use_params};
use leptos_router::params::Params;
use log::error;
use std::str::FromStr;
use strum::IntoEnumIterator;

fn summary_text(s: &SearchSummary) -> String {
    match &s.query {
        Some(q) if s.shown == 0 => format!("No centers found matching \"{q}\""),
        Some(q) => format!(
            "Showing {} result{} for \"{q}\"",
            s.shown,
            if s.shown == 1 { "" } else { "s" }
        ),
        None => format!("{} recreation centers", s.total),
    }
}

/// Parse a numeric form field; blank reads as `default`.
fn parse_field<T: FromStr>(field: &str, label: &str, raw: &str, default: T) -> Result<T, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }
    raw.parse()
        .map_err(|_| ApiError::validation(field, format!("{label} must be a number")))
}

fn ensure_catalog(app_state: AppState) {
    let loaded = app_state.store.with_untracked(|s| s.is_loaded());
    let loading = app_state.load.with_untracked(|t| t.is_loading());
    if !loaded && !loading {
        app_state.start_load(LoadTrigger::Initial);
    }
}

#[component]
pub fn AppLayout(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>().0;
    let session = app_state.session;
    let profile = app_state.profile;

    let is_admin = move || session.with(|s| s.is_admin());
    let account_label = move || {
        session.with(|s| {
            s.session()
                .map(|sess| profile.with(|p| display_name(sess, p.as_ref())))
        })
    };

    view! {
        <div class="min-h-screen bg-background">
            <header class="border-b border-border">
                <nav class="mx-auto flex max-w-6xl items-center gap-4 px-4 py-3 text-sm">
                    <a href="/" class="font-semibold text-foreground">"Rec Center Finder"</a>
                    <a href="/" class="text-muted-foreground hover:text-foreground">"Browse"</a>
                    <a href="/favorites" class="text-muted-foreground hover:text-foreground">"Favorites"</a>
                    <Show when=is_admin fallback=|| ().into_view()>
                        <a href="/admin" class="text-muted-foreground hover:text-foreground">"Admin"</a>
                    </Show>
                    <div class="ml-auto">
                        {move || match account_label() {
                            Some(name) => view! {
                                <a href="/profile" class="text-foreground hover:underline">{name}</a>
                            }
                            .into_any(),
                            None => view! {
                                <a href="/auth" class="text-primary hover:underline">"Sign in"</a>
                            }
                            .into_any(),
                        }}
                    </div>
                </nav>
            </header>
            <main class="mx-auto max-w-6xl px-4 py-6">{children()}</main>
            <NoticeToast />
        </div>
    }
}

#[component]
fn NoticeToast() -> impl IntoView {
    let notice = expect_context::<AppContext>().0.notice;

    view! {
        {move || {
            notice
                .get()
                .map(|n| {
                    let tone = match n.kind {
                        NoticeKind::Error => "border-destructive/40 text-destructive",
                        NoticeKind::Info => "border-border text-foreground",
                    };
                    view! {
                        <div
                            class=format!(
                                "fixed bottom-4 right-4 z-50 flex max-w-sm items-center gap-3 rounded-md border bg-background px-4 py-3 text-sm shadow-lg {tone}",
                            )
                            role="status"
                        >
                            <span>{n.message}</span>
                            <button
                                class="text-muted-foreground hover:text-foreground"
                                aria-label="Dismiss"
                                on:click=move |_| notice.set(None)
                            >
                                <X class="size-4" />
                            </button>
                        </div>
                    }
                })
        }}
    }
}

#[component]
pub fn CentersPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>().0;
    let query = app_state.search_query;
    let store = app_state.store;
    let load = app_state.load;

    ensure_catalog(app_state);

    // Re-filter on every query change; a load that lands later re-filters
    // under the same query inside the store.
    Effect::new(move |_| {
        let q = query.get();
        store.update(|s| s.apply_search(&q));
        save_last_query(&q);
    });

    // Leaving the page cancels a scheduled auto retry.
    on_cleanup(move || app_state.cancel_retry());

    let loading = move || load.with(|t| t.is_loading());
    let first_load = move || loading() && !store.with(|s| s.is_loaded());
    let banner = Signal::derive(move || load.with(|t| t.error_banner().map(str::to_string)));
    let retry_disabled = Signal::derive(move || load.with(|t| !t.can_retry()));
    let on_retry = Callback::new(move |_| app_state.start_load(LoadTrigger::UserRetry));

    let diagnostics = move || {
        load.with(|t| {
            t.last_status().filter(|s| !s.success).map(|s| {
                let endpoint = s
                    .diagnostics
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| app_state.config.with_value(|c| c.supabase_url.clone()));
                let code = s
                    .status_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "no response".to_string());
                let raw = s.raw_error.as_ref().map(|e| e.message.clone()).unwrap_or_default();
                let pending = if t.retry_pending() { " (retrying automatically)" } else { "" };
                format!("attempt {} · {endpoint} · {code}{pending} · {raw}", s.diagnostics.attempt)
            })
        })
    };

    view! {
        <div class="space-y-5">
            <div class="space-y-1">
                <h1 class="text-xl font-semibold">"Find a recreation center"</h1>
                <p class="text-xs text-muted-foreground">
                    "Search by name, city, amenity or program."
                </p>
            </div>

            <Input
                r#type="search"
                placeholder="Try \"pool\" or \"Portland\""
                bind_value=query
                class="max-w-md"
            />

            <ErrorBanner message=banner retry_disabled=retry_disabled on_retry=on_retry />
            {move || {
                diagnostics()
                    .map(|d| view! { <p class="font-mono text-[11px] text-muted-foreground">{d}</p> })
            }}

            <Show
                when=move || !first_load()
                fallback=|| view! { <LoadingBlock label="Connecting to database..." /> }
            >
                <div class="flex items-center gap-2 text-xs text-muted-foreground">
                    {move || store.with(|s| summary_text(&s.summary()))}
                    <Show when=loading fallback=|| ().into_view()>
                        <Spinner class="size-3" />
                    </Show>
                </div>
                <CardGrid>
                    {move || {
                        store
                            .with(|s| s.filtered().to_vec())
                            .into_iter()
                            .map(|c| view! { <CenterCard center=c /> })
                            .collect_view()
                    }}
                </CardGrid>
            </Show>
        </div>
    }
}

#[derive(Params, PartialEq, Clone, Debug)]
pub struct CenterRouteParams {
    pub id: Option<String>,
}

#[component]
pub fn CenterDetailPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>().0;
    let params = use_params::<CenterRouteParams>();
    let center_id = move || params.get().ok().and_then(|p| p.id).unwrap_or_default();

    let center: RwSignal<Option<Center>> = RwSignal::new(None);
    let programs: RwSignal<Vec<Program>> = RwSignal::new(vec![]);
    let loading: RwSignal<bool> = RwSignal::new(false);
    let not_found: RwSignal<bool> = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let request_id: RwSignal<u64> = RwSignal::new(0);

    Effect::new(move |_| {
        let id = center_id();
        if id.trim().is_empty() {
            not_found.set(true);
            return;
        }

        let req = request_id.get_untracked().wrapping_add(1);
        request_id.set(req);

        // Show the list copy right away; the fetch below refreshes it.
        center.set(app_state.store.with_untracked(|s| s.get(&id).cloned()));
        programs.set(vec![]);
        not_found.set(false);
        error.set(None);
        loading.set(true);

        let client = app_state.client.get_untracked();
        spawn_local(async move {
            let fetched = client.fetch_by_id(&id).await;
            let progs = client.fetch_programs(&id).await;

            // Ignore stale responses (or a page that is gone).
            if request_id.try_get_untracked() != Some(req) {
                return;
            }

            match fetched {
                Ok(Some(c)) => center.set(Some(c)),
                Ok(None) => {
                    center.set(None);
                    not_found.set(true);
                }
                Err(e) => error.set(Some(e.message)),
            }
            match progs {
                Ok(p) => programs.set(p),
                Err(e) => app_state.notify_error(format!("Programs unavailable: {e}")),
            }
            loading.set(false);
        });
    });

    view! {
        <div class="space-y-5">
            <a href="/" class="text-xs text-primary hover:underline">"← Back to all centers"</a>

            <Show when=move || error.get().is_some() fallback=|| ().into_view()>
                <Alert class="border-destructive/30">
                    <AlertDescription class="text-destructive text-xs">
                        {move || error.get().unwrap_or_default()}
                    </AlertDescription>
                </Alert>
            </Show>

            {move || {
                if not_found.get() {
                    return view! {
                        <div class="rounded-md border border-border bg-muted p-6 text-sm text-muted-foreground">
                            "Recreation center not found."
                        </div>
                    }
                    .into_any();
                }
                match center.get() {
                    Some(c) => view! { <CenterDetail center=c programs=programs /> }.into_any(),
                    None if loading.get() => view! { <LoadingBlock label="Loading center..." /> }.into_any(),
                    None => ().into_any(),
                }
            }}
        </div>
    }
}

#[component]
fn HoursTable(hours: WeeklyHours) -> impl IntoView {
    view! {
        <table class="w-full text-xs">
            <tbody>
                {Weekday::iter()
                    .map(|d| {
                        let value = hours.get(d).to_string();
                        view! {
                            <tr class="border-b border-border last:border-0">
                                <td class="py-1 pr-4 font-medium">{d.to_string()}</td>
                                <td class="py-1 text-muted-foreground">
                                    {if value.trim().is_empty() { "Closed".to_string() } else { value }}
                                </td>
                            </tr>
                        }
                    })
                    .collect_view()}
            </tbody>
        </table>
    }
}

#[component]
fn CenterDetail(center: Center, programs: RwSignal<Vec<Program>>) -> impl IntoView {
    let contact: Vec<(&'static str, String)> = [
        ("Address", center.address.clone()),
        ("Postal code", center.postal_code.clone()),
        ("Phone", center.phone.clone()),
        ("Email", center.email.clone()),
        ("Website", center.website.clone()),
    ]
    .into_iter()
    .filter(|(_, v)| !v.trim().is_empty())
    .collect();

    view! {
        <div class="grid gap-6 lg:grid-cols-[2fr_1fr]">
            <div class="space-y-4">
                <img src=center.image_url.clone() alt=center.name.clone() class="h-64 w-full rounded-xl object-cover" />
                <div class="flex items-start justify-between gap-4">
                    <div class="space-y-1">
                        <h1 class="text-2xl font-semibold">{center.name.clone()}</h1>
                        <p class="text-sm text-muted-foreground">{center.location_line()}</p>
                        <p class="text-xs text-amber-600">
                            {format!("★ {:.1} · {} reviews", center.rating, center.reviews)}
                        </p>
                    </div>
                    <FavoriteButton center_id=center.id.clone() />
                </div>
                <p class="text-sm leading-relaxed">{center.description.clone()}</p>

                <div class="space-y-2">
                    <h2 class="text-sm font-semibold">"Programs"</h2>
                    <Show
                        when=move || programs.with(|p| !p.is_empty())
                        fallback=|| view! { <p class="text-xs text-muted-foreground">"No programs listed."</p> }
                    >
                        <div class="space-y-2">
                            {move || {
                                programs
                                    .get()
                                    .into_iter()
                                    .map(|p| {
                                        let meta = [p.schedule.clone(), p.age_group.clone(), p.price.clone()]
                                            .into_iter()
                                            .filter(|s| !s.trim().is_empty())
                                            .collect::<Vec<_>>()
                                            .join(" · ");
                                        view! {
                                            <div class="rounded-md border border-border px-3 py-2">
                                                <div class="text-sm font-medium">{p.name}</div>
                                                <div class="text-xs text-muted-foreground">{meta}</div>
                                                <p class="pt-1 text-xs">{p.description}</p>
                                            </div>
                                        }
                                    })
                                    .collect_view()
                            }}
                        </div>
                    </Show>
                </div>
            </div>

            <div class="space-y-4">
                <Card>
                    <CardHeader>
                        <CardTitle class="text-sm">"Hours"</CardTitle>
                    </CardHeader>
                    <CardContent>
                        <HoursTable hours=center.hours.clone() />
                    </CardContent>
                </Card>
                <Card>
                    <CardHeader>
                        <CardTitle class="text-sm">"Contact"</CardTitle>
                    </CardHeader>
                    <CardContent class="space-y-1 text-xs">
                        {contact
                            .into_iter()
                            .map(|(k, v)| view! {
                                <div>
                                    <span class="font-medium">{k}": "</span>
                                    <span class="text-muted-foreground">{v}</span>
                                </div>
                            })
                            .collect_view()}
                    </CardContent>
                </Card>
                <Card>
                    <CardHeader>
                        <CardTitle class="text-sm">"Amenities"</CardTitle>
                    </CardHeader>
                    <CardContent class="flex flex-wrap gap-1">
                        {center
                            .amenities
                            .iter()
                            .cloned()
                            .map(|a| view! { <span class="rounded-full bg-muted px-2 py-0.5 text-[11px]">{a}</span> })
                            .collect_view()}
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}

#[component]
pub fn FavoritesPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>().0;
    let store = app_state.store;
    let favorites = app_state.favorites;

    ensure_catalog(app_state);
    on_cleanup(move || app_state.cancel_retry());

    let signed_in = move || app_state.session.with(|s| s.is_signed_in());
    let centers = move || {
        favorites.with(|f| store.with(|s| s.resolve(f.ids())))
    };

    view! {
        <div class="space-y-5">
            <h1 class="text-xl font-semibold">"My favorites"</h1>
            <Show
                when=signed_in
                fallback=|| view! {
                    <div class="rounded-md border border-border bg-muted p-4 text-sm text-muted-foreground">
                        "Please "
                        <a href="/auth" class="text-primary underline underline-offset-4">"sign in"</a>
                        " to save favorites."
                    </div>
                }
            >
                {move || {
                    let list = centers();
                    if list.is_empty() {
                        view! {
                            <div class="rounded-md border border-border bg-muted p-4 text-sm text-muted-foreground">
                                "No favorites yet. Tap \"Save\" on a center to keep it here."
                            </div>
                        }
                        .into_any()
                    } else {
                        view! {
                            <CardGrid>
                                {list.into_iter().map(|c| view! { <CenterCard center=c /> }).collect_view()}
                            </CardGrid>
                        }
                        .into_any()
                    }
                }}
            </Show>
        </div>
    }
}

#[component]
pub fn AdminPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>().0;
    let gate = move || {
        app_state
            .session
            .with(|s| s.require_admin().map(|_| ()).map_err(|e| e.message))
    };

    view! {
        {move || match gate() {
            Ok(()) => view! { <AdminPanel /> }.into_any(),
            Err(msg) => view! {
                <Alert class="border-destructive/30">
                    <AlertTitle>"Admin access required"</AlertTitle>
                    <AlertDescription class="text-xs">
                        {msg}" "
                        <a href="/auth" class="text-primary underline underline-offset-4">"Sign in"</a>
                    </AlertDescription>
                </Alert>
            }
            .into_any(),
        }}
    }
}

#[component]
fn AdminPanel() -> impl IntoView {
    let app_state = expect_context::<AppContext>().0;
    let store = app_state.store;
    let editing: RwSignal<Option<CenterDraft>> = RwSignal::new(None);
    let deleting: RwSignal<Option<String>> = RwSignal::new(None);

    ensure_catalog(app_state);
    on_cleanup(move || app_state.cancel_retry());

    let on_delete = move |c: Center| {
        if deleting.get_untracked().is_some() {
            return;
        }
        let confirmed = window()
            .confirm_with_message(&format!("Delete \"{}\"? This cannot be undone.", c.name))
            .unwrap_or(false);
        if !confirmed {
            return;
        }
        if let Err(e) = app_state.session.with_untracked(|s| s.require_admin().map(|_| ())) {
            app_state.notify_error(e.message);
            return;
        }

        deleting.set(Some(c.id.clone()));
        let client = app_state.client.get_untracked();
        spawn_local(async move {
            match client.delete(&c.id).await {
                Ok(outcome) => {
                    store.update(|s| {
                        s.reconcile_after_delete(&c.id);
                    });
                    match outcome {
                        WriteOutcome::Applied(()) => {
                            app_state.notify(NoticeKind::Info, format!("Deleted {}", c.name))
                        }
                        WriteOutcome::NoRowsAffected => app_state
                            .notify(NoticeKind::Info, format!("{} was already removed", c.name)),
                    }
                }
                Err(e) => {
                    error!("delete {} failed: {e}", c.id);
                    app_state.notify_error(e.message);
                }
            }
            deleting.set(None);
        });
    };
    let on_delete = StoredValue::new(on_delete);

    view! {
        <div class="space-y-5">
            <div class="flex items-center justify-between">
                <h1 class="text-xl font-semibold">"Manage recreation centers"</h1>
                <Button size=ButtonSize::Sm on:click=move |_| editing.set(Some(CenterDraft::default()))>
                    "New center"
                </Button>
            </div>

            {move || {
                editing
                    .get()
                    .map(|draft| {
                        view! {
                            <CenterForm
                                draft=draft
                                on_done=Callback::new(move |_| editing.set(None))
                            />
                        }
                    })
            }}

            <div class="divide-y divide-border rounded-md border border-border">
                {move || {
                    store
                        .with(|s| s.canonical().to_vec())
                        .into_iter()
                        .map(|c| {
                            let for_edit = c.clone();
                            let for_delete = c.clone();
                            let id = c.id.clone();
                            let busy = move || deleting.with(|d| d.as_deref() == Some(id.as_str()));
                            view! {
                                <div class="flex items-center justify-between gap-3 px-3 py-2">
                                    <div class="min-w-0">
                                        <div class="truncate text-sm font-medium">{c.name.clone()}</div>
                                        <div class="truncate text-xs text-muted-foreground">{c.location_line()}</div>
                                    </div>
                                    <div class="flex shrink-0 gap-2">
                                        <Button
                                            variant=ButtonVariant::Outline
                                            size=ButtonSize::Sm
                                            on:click=move |_| editing.set(Some(CenterDraft::from_center(&for_edit)))
                                        >
                                            "Edit"
                                        </Button>
                                        <Button
                                            variant=ButtonVariant::Destructive
                                            size=ButtonSize::Sm
                                            attr:disabled=busy
                                            on:click=move |_| on_delete.with_value(|f| f(for_delete.clone()))
                                        >
                                            "Delete"
                                        </Button>
                                    </div>
                                </div>
                            }
                        })
                        .collect_view()
                }}
            </div>
        </div>
    }
}

#[component]
fn CenterForm(draft: CenterDraft, on_done: Callback<()>) -> impl IntoView {
    let app_state = expect_context::<AppContext>().0;
    let is_new = draft.is_new();
    let id = StoredValue::new(draft.id.clone());

    let name = RwSignal::new(draft.name);
    let description = RwSignal::new(draft.description);
    let address = RwSignal::new(draft.address);
    let city = RwSignal::new(draft.city);
    let state = RwSignal::new(draft.state);
    let postal_code = RwSignal::new(draft.postal_code);
    let phone = RwSignal::new(draft.phone);
    let email = RwSignal::new(draft.email);
    let website = RwSignal::new(draft.website);
    let amenities = RwSignal::new(draft.amenities_input);
    let image_url = RwSignal::new(draft.image_url);
    let rating = RwSignal::new(draft.rating.to_string());
    let reviews = RwSignal::new(draft.reviews.to_string());
    let lat = RwSignal::new(draft.coordinates.lat.to_string());
    let lng = RwSignal::new(draft.coordinates.lng.to_string());
    let hours: StoredValue<Vec<(Weekday, RwSignal<String>)>> = StoredValue::new(
        Weekday::iter()
            .map(|d| (d, RwSignal::new(draft.hours.get(d).to_string())))
            .collect(),
    );

    let saving: RwSignal<bool> = RwSignal::new(false);
    let failure: RwSignal<Option<ApiError>> = RwSignal::new(None);

    let error_for = move |field: &'static str| {
        Signal::derive(move || {
            failure.with(|f| {
                f.as_ref()
                    .filter(|e| e.field.as_deref() == Some(field))
                    .map(|e| e.message.clone())
            })
        })
    };
    let invalid = move |field: &'static str| Signal::derive(move || error_for(field).get().is_some());
    let form_error = move || {
        failure.with(|f| f.as_ref().filter(|e| e.field.is_none()).map(|e| e.message.clone()))
    };

    let collect = move || -> Result<CenterDraft, ApiError> {
        let mut week = WeeklyHours::default();
        hours.with_value(|hs| {
            for (d, v) in hs {
                week.set(*d, v.get_untracked());
            }
        });
        Ok(CenterDraft {
            id: id.get_value(),
            name: name.get_untracked(),
            description: description.get_untracked(),
            address: address.get_untracked(),
            city: city.get_untracked(),
            state: state.get_untracked(),
            postal_code: postal_code.get_untracked(),
            phone: phone.get_untracked(),
            email: email.get_untracked(),
            website: website.get_untracked(),
            hours: week,
            amenities_input: amenities.get_untracked(),
            image_url: image_url.get_untracked(),
            rating: parse_field("rating", "Rating", &rating.get_untracked(), 0.0)?,
            reviews: parse_field("reviews", "Review count", &reviews.get_untracked(), 0)?,
            coordinates: Coordinates {
                lat: parse_field("coordinates", "Latitude", &lat.get_untracked(), 0.0)?,
                lng: parse_field("coordinates", "Longitude", &lng.get_untracked(), 0.0)?,
            },
        })
    };

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        if saving.get_untracked() {
            return;
        }
        if let Err(e) = app_state.session.with_untracked(|s| s.require_admin().map(|_| ())) {
            failure.set(Some(e));
            return;
        }
        let draft = match collect() {
            Ok(d) => d,
            Err(e) => {
                failure.set(Some(e));
                return;
            }
        };

        failure.set(None);
        saving.set(true);
        let client = app_state.client.get_untracked();
        spawn_local(async move {
            match save_center(&client, draft).await {
                Ok(saved) => {
                    app_state.store.update(|s| s.apply_saved(&saved));
                    match &saved {
                        SavedCenter::Created(c) => {
                            app_state.notify(NoticeKind::Info, format!("Created {}", c.name))
                        }
                        SavedCenter::Updated(c) => {
                            app_state.notify(NoticeKind::Info, format!("Saved {}", c.name))
                        }
                        SavedCenter::Missing(_) => app_state
                            .notify_error("No changes were saved: the center was not found or you lack permission"),
                    }
                    on_done.run(());
                }
                // Keep the form as is so the admin can correct it.
                Err(e) => {
                    error!("saving center failed: {e}");
                    app_state.notify_error(e.message.clone());
                    failure.set(Some(e));
                }
            }
            saving.set(false);
        });
    };

    let text_field = move |fid: &'static str, label: &'static str, value: RwSignal<String>| {
        view! {
            <div class="flex flex-col gap-1.5">
                <Label html_for=fid>{label}</Label>
                <Input id=fid bind_value=value invalid=invalid(fid) />
                <FieldError message=error_for(fid) />
            </div>
        }
    };

    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-base">
                    {if is_new { "New recreation center" } else { "Edit recreation center" }}
                </CardTitle>
                <CardDescription class="text-xs">"Name and city are required."</CardDescription>
            </CardHeader>
            <CardContent>
                <form class="grid gap-3 sm:grid-cols-2" on:submit=on_submit>
                    {text_field("name", "Name", name)}
                    {text_field("city", "City", city)}
                    {text_field("address", "Street address", address)}
                    {text_field("state", "State", state)}
                    {text_field("postal_code", "Postal code", postal_code)}
                    {text_field("phone", "Phone", phone)}
                    {text_field("email", "Email", email)}
                    {text_field("website", "Website", website)}
                    {text_field("image_url", "Image URL", image_url)}
                    {text_field("amenities", "Amenities (comma separated)", amenities)}
                    {text_field("rating", "Rating (0-5)", rating)}
                    {text_field("reviews", "Review count", reviews)}
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="lat">"Latitude / longitude"</Label>
                        <div class="flex gap-2">
                            <Input id="lat" bind_value=lat invalid=invalid("coordinates") />
                            <Input id="lng" bind_value=lng invalid=invalid("coordinates") />
                        </div>
                        <FieldError message=error_for("coordinates") />
                    </div>
                    <div class="flex flex-col gap-1.5 sm:col-span-2">
                        <Label html_for="description">"Description"</Label>
                        <TextArea id="description" bind_value=description />
                    </div>
                    <div class="grid gap-2 sm:col-span-2 sm:grid-cols-2">
                        {hours
                            .get_value()
                            .into_iter()
                            .map(|(d, v)| {
                                let fid = format!("hours_{}", d.as_ref().to_lowercase());
                                view! {
                                    <div class="flex items-center gap-2">
                                        <Label html_for=fid.clone() class="w-24">{d.to_string()}</Label>
                                        <Input id=fid bind_value=v class="h-8" />
                                    </div>
                                }
                            })
                            .collect_view()}
                    </div>

                    <div class="sm:col-span-2">
                        <Show when=move || form_error().is_some() fallback=|| ().into_view()>
                            <Alert class="border-destructive/30">
                                <AlertDescription class="text-destructive text-xs">
                                    {move || form_error().unwrap_or_default()}
                                </AlertDescription>
                            </Alert>
                        </Show>
                    </div>

                    <div class="flex gap-2 sm:col-span-2">
                        <Button size=ButtonSize::Sm attr:disabled=move || saving.get()>
                            <span class="inline-flex items-center gap-2">
                                <Show when=move || saving.get() fallback=|| ().into_view()>
                                    <Spinner />
                                </Show>
                                {move || if saving.get() { "Saving..." } else { "Save" }}
                            </span>
                        </Button>
                        <button
                            type="button"
                            class="px-3 text-xs text-muted-foreground hover:text-foreground"
                            on:click=move |_| on_done.run(())
                        >
                            "Cancel"
                        </button>
                    </div>
                </form>
            </CardContent>
        </Card>
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AuthMode {
    SignIn,
    SignUp,
}

#[component]
pub fn AuthPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>().0;
    let navigate = StoredValue::new(use_navigate());

    let mode: RwSignal<AuthMode> = RwSignal::new(AuthMode::SignIn);
    let email: RwSignal<String> = RwSignal::new(String::new());
    let password: RwSignal<String> = RwSignal::new(String::new());
    let username: RwSignal<String> = RwSignal::new(String::new());
    let failure: RwSignal<Option<ApiError>> = RwSignal::new(None);
    let info: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);

    let error_for = move |field: &'static str| {
        Signal::derive(move || {
            failure.with(|f| {
                f.as_ref()
                    .filter(|e| e.field.as_deref() == Some(field))
                    .map(|e| e.message.clone())
            })
        })
    };
    let form_error = move || {
        failure.with(|f| f.as_ref().filter(|e| e.field.is_none()).map(|e| e.message.clone()))
    };

    let finish = move |s: session::Session| {
        app_state.set_session(SessionContext::SignedIn(s));
        navigate.with_value(|nav| nav("/", Default::default()));
    };

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        if loading.get_untracked() {
            return;
        }
        let email_val = email.get_untracked();
        let password_val = password.get_untracked();
        let username_val = username.get_untracked();
        let current = mode.get_untracked();
        let client = app_state.client.get_untracked();

        loading.set(true);
        failure.set(None);
        info.set(None);

        spawn_local(async move {
            match current {
                AuthMode::SignIn => match session::sign_in(&client, &email_val, &password_val).await {
                    Ok(s) => finish(s),
                    Err(e) => failure.set(Some(e)),
                },
                AuthMode::SignUp => {
                    match session::sign_up(&client, &email_val, &password_val, &username_val).await {
                        Ok(SignUpResult::SignedIn(s)) => finish(s),
                        Ok(SignUpResult::ConfirmationRequired) => {
                            info.set(Some(
                                "Account created. Check your email to confirm it, then sign in.".to_string(),
                            ));
                            mode.set(AuthMode::SignIn);
                        }
                        Err(e) => failure.set(Some(e)),
                    }
                }
            }
            loading.set(false);
        });
    };

    let switch_mode = move |_| {
        mode.update(|m| {
            *m = match m {
                AuthMode::SignIn => AuthMode::SignUp,
                AuthMode::SignUp => AuthMode::SignIn,
            }
        });
        failure.set(None);
    };

    view! {
        <div class="mx-auto flex w-full max-w-sm flex-col py-6">
            <Card>
                <CardHeader>
                    <CardTitle class="text-lg">
                        {move || match mode.get() {
                            AuthMode::SignIn => "Sign in",
                            AuthMode::SignUp => "Create account",
                        }}
                    </CardTitle>
                    <CardDescription class="text-xs">
                        "Save favorites and manage your profile."
                    </CardDescription>
                </CardHeader>
                <CardContent>
                    <form class="flex flex-col gap-3" on:submit=on_submit>
                        <Show when=move || mode.get() == AuthMode::SignUp fallback=|| ().into_view()>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="username">"Username"</Label>
                                <Input id="username" placeholder="yourname" bind_value=username class="h-8" />
                                <FieldError message=error_for("username") />
                            </div>
                        </Show>

                        <div class="flex flex-col gap-1.5">
                            <Label html_for="email">"Email"</Label>
                            <Input
                                id="email"
                                r#type="email"
                                placeholder="you@example.com"
                                bind_value=email
                                required=true
                                class="h-8"
                            />
                            <FieldError message=error_for("email") />
                        </div>

                        <div class="flex flex-col gap-1.5">
                            <Label html_for="password">"Password"</Label>
                            <Input
                                id="password"
                                r#type="password"
                                placeholder="••••••••"
                                bind_value=password
                                required=true
                                class="h-8"
                            />
                            <FieldError message=error_for("password") />
                        </div>

                        {move || {
                            form_error()
                                .map(|e| {
                                    view! {
                                        <Alert class="border-destructive/30">
                                            <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                                        </Alert>
                                    }
                                })
                        }}
                        {move || {
                            info.get()
                                .map(|m| {
                                    view! {
                                        <Alert>
                                            <AlertDescription class="text-xs">{m}</AlertDescription>
                                        </Alert>
                                    }
                                })
                        }}

                        <Button class="w-full" size=ButtonSize::Sm attr:disabled=move || loading.get()>
                            <span class="inline-flex items-center gap-2">
                                <Show when=move || loading.get() fallback=|| ().into_view()>
                                    <Spinner />
                                </Show>
                                {move || match (loading.get(), mode.get()) {
                                    (true, _) => "Please wait...",
                                    (false, AuthMode::SignIn) => "Sign in",
                                    (false, AuthMode::SignUp) => "Sign up",
                                }}
                            </span>
                        </Button>

                        <button
                            type="button"
                            class="pt-1 text-left text-xs text-primary underline underline-offset-4"
                            on:click=switch_mode
                        >
                            {move || match mode.get() {
                                AuthMode::SignIn => "No account? Sign up",
                                AuthMode::SignUp => "Already have an account? Sign in",
                            }}
                        </button>
                    </form>
                </CardContent>
            </Card>
        </div>
    }
}

#[component]
pub fn ProfilePage() -> impl IntoView {
    let app_state = expect_context::<AppContext>().0;
    let navigate = StoredValue::new(use_navigate());
    let ctx = app_state.session;
    let profile = app_state.profile;

    let username: RwSignal<String> = RwSignal::new(String::new());
    let failure: RwSignal<Option<String>> = RwSignal::new(None);
    let saving: RwSignal<bool> = RwSignal::new(false);

    // Prefill once the profile arrives.
    Effect::new(move |_| {
        if let Some(name) = profile.with(|p| p.as_ref().and_then(|p| p.username.clone())) {
            username.set(name);
        }
    });

    let on_save = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let Some(s) = ctx.with_untracked(|c| c.session().cloned()) else {
            return;
        };
        let name = username.get_untracked();
        let client = app_state.client.get_untracked();
        saving.set(true);
        failure.set(None);
        spawn_local(async move {
            match session::rename(&client, &s, &name).await {
                Ok(p) => {
                    profile.set(Some(p));
                    app_state.notify(NoticeKind::Info, "Profile updated");
                }
                Err(e) => failure.set(Some(e.message)),
            }
            saving.set(false);
        });
    };

    let on_sign_out = move |_| {
        app_state.sign_out();
        navigate.with_value(|nav| nav("/", Default::default()));
    };

    view! {
        <Show
            when=move || ctx.with(|s| s.is_signed_in())
            fallback=|| view! {
                <div class="rounded-md border border-border bg-muted p-4 text-sm text-muted-foreground">
                    "Please "
                    <a href="/auth" class="text-primary underline underline-offset-4">"sign in"</a>
                    " to view your profile."
                </div>
            }
        >
            <div class="mx-auto max-w-md space-y-4">
                <h1 class="text-xl font-semibold">"Profile"</h1>
                <p class="text-xs text-muted-foreground">
                    {move || ctx.with(|s| s.session().and_then(|x| x.email.clone()).unwrap_or_default())}
                    {move || if ctx.with(|s| s.is_admin()) { " · admin" } else { "" }}
                </p>
                <form class="flex flex-col gap-2" on:submit=on_save>
                    <Label html_for="profile_username">"Username"</Label>
                    <Input id="profile_username" bind_value=username class="h-8" />
                    <FieldError message=Signal::derive(move || failure.get()) />
                    <Button size=ButtonSize::Sm attr:disabled=move || saving.get()>
                        {move || if saving.get() { "Saving..." } else { "Save" }}
                    </Button>
                </form>
                <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=on_sign_out>
                    "Sign out"
                </Button>
            </div>
        </Show>
    }
}
