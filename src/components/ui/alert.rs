use leptos::prelude::*;
use leptos_ui::clx;

use super::button::{Button, ButtonSize, ButtonVariant};

mod components {
    use super::*;
    clx! {Alert, div, "relative w-full rounded-lg border px-4 py-3 text-sm"}
    clx! {AlertTitle, h4, "mb-1 font-medium tracking-tight leading-none"}
    clx! {AlertDescription, p, "text-sm [&_p]:leading-relaxed"}
}

pub use components::*;

/// Inline error message for a form field.
#[component]
pub fn FieldError(#[prop(into)] message: Signal<Option<String>>) -> impl IntoView {
    view! {
        {move || {
            message
                .get()
                .map(|m| view! { <p class="text-xs text-destructive" role="alert">{m}</p> })
        }}
    }
}

/// Load failure banner with a retry action. Hidden while `message` is `None`.
#[component]
pub fn ErrorBanner(
    #[prop(into)] message: Signal<Option<String>>,
    #[prop(into)] retry_disabled: Signal<bool>,
    on_retry: Callback<()>,
) -> impl IntoView {
    view! {
        <Show when=move || message.get().is_some() fallback=|| ().into_view()>
            <Alert class="border-destructive/30 bg-destructive/5">
                <AlertTitle class="text-destructive">"Connection problem"</AlertTitle>
                <AlertDescription class="text-destructive text-xs">
                    {move || message.get().unwrap_or_default()}
                </AlertDescription>
                <div class="mt-3">
                    <Button
                        variant=ButtonVariant::Outline
                        size=ButtonSize::Sm
                        attr:disabled=move || retry_disabled.get()
                        on:click=move |_| on_retry.run(())
                    >
                        "Retry"
                    </Button>
                </div>
            </Alert>
        </Show>
    }
}
