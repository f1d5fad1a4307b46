use maud::DOCTYPE;
use maud::Markup;
use maud::html;

use crate::auth::user::User;

pub fn theme(content: Markup) -> Markup {
    theme_with_head(None, html! {}, content)
}

pub fn theme_with_head(title: Option<&str>, extra_head: Markup, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" class="h-full bg-white dark:bg-gray-900 text-gray-900 dark:text-white" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4" {}
                @if let Some(title) = title {
                    title { (title) " - Tinyblog" }
                }
                (extra_head)
            }
            body {
                (content)
            }
        }
    }
}

const NAV_LINK: &str = "text-xs text-gray-500 hover:text-gray-700 dark:text-gray-400 dark:hover:text-gray-200 px-2 py-1";

/// Page chrome shared by every page: nav bar reflecting who is logged in,
/// an optional message banner, then the page content.
pub fn layout(title: &str, user: Option<&User>, message: Option<&str>, content: Markup) -> Markup {
    theme_with_head(
        Some(title),
        html! {},
        html! {
            div class="min-h-full" {
                nav class="bg-white dark:bg-gray-800 border-b border-gray-200 dark:border-gray-700" {
                    div class="max-w-7xl mx-auto px-4 sm:px-6 lg:px-8" {
                        div class="flex justify-between h-16" {
                            div class="flex items-center" {
                                a href="/" class="text-xl font-bold text-gray-900 dark:text-white" {
                                    "Tinyblog"
                                }
                            }
                            ul class="flex items-center gap-4" {
                                @if let Some(user) = user {
                                    li class="text-sm text-gray-700 dark:text-gray-200" { (user.username) }
                                    li { a href="/auth/logout" class=(NAV_LINK) { "Log Out" } }
                                } @else {
                                    li { a href="/auth/register" class=(NAV_LINK) { "Register" } }
                                    li { a href="/auth/login" class=(NAV_LINK) { "Log In" } }
                                }
                            }
                        }
                    }
                }

                div class="flex-1 p-6" {
                    div class="max-w-7xl mx-auto" {
                        div class="flex flex-col gap-6 sm:mx-auto sm:w-full sm:max-w-sm" {
                            @if let Some(message) = message {
                                p id="flash_message" class="text-center text-sm/6 text-red-500" {
                                    (message)
                                }
                            }
                            (content)
                        }
                    }
                }
            }
        },
    )
}
