use crate::pages::{
    AdminPage, AppLayout, AuthPage, CenterDetailPage, CentersPage, FavoritesPage, ProfilePage,
};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    let app_state = AppState::new();
    provide_context(AppContext(app_state));

    // A restored session is trusted optimistically and checked in the background.
    app_state.revalidate_session();
    app_state.load_user_data();

    view! {
        <Router>
            <Routes fallback=|| view! {
                <AppLayout>
                    <div class="py-8 text-xs text-muted-foreground">"Page not found"</div>
                </AppLayout>
            }>
                <Route path=path!("") view=|| view! { <AppLayout><CentersPage /></AppLayout> } />
                <Route path=path!("centers/:id") view=|| view! { <AppLayout><CenterDetailPage /></AppLayout> } />
                <Route path=path!("favorites") view=|| view! { <AppLayout><FavoritesPage /></AppLayout> } />
                <Route path=path!("admin") view=|| view! { <AppLayout><AdminPage /></AppLayout> } />
                <Route path=path!("auth") view=|| view! { <AppLayout><AuthPage /></AppLayout> } />
                <Route path=path!("profile") view=|| view! { <AppLayout><ProfilePage /></AppLayout> } />
            </Routes>
        </Router>
    }
}
