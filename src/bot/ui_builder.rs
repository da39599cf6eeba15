//! UI Builder module for creating keyboards and formatting messages

use crate::localization::{t_args_lang, t_lang};
use crate::menu::{Activity, Callback, InputField};
use crate::render::{Extension, RenderConfig, Shape};
use crate::telegram::{Button, Keyboard};

const ITERATION_PRESETS: [u32; 5] = [100, 200, 400, 800, 1000];
const REPETITION_PRESETS: [u32; 5] = [1, 2, 3, 4, 5];
const ALPHA_PRESETS: [u8; 4] = [32, 64, 128, 255];
const SIZE_PRESETS: [u32; 6] = [256, 512, 720, 1080, 1280, 1920];

/// Append a check mark to the currently selected option
fn option_label(label: impl Into<String>, selected: bool) -> String {
    let label = label.into();
    if selected {
        format!("{label} ✔️")
    } else {
        label
    }
}

fn back_row(target: Callback, language: Option<&str>) -> Vec<Button> {
    vec![Button::new(t_lang("button-back", language), target)]
}

/// Localized display name of a shape
pub fn shape_name(shape: Shape, language: Option<&str>) -> String {
    t_lang(shape.message_key(), language)
}

/// Alpha value as shown to the user
pub fn alpha_label(alpha: u8, language: Option<&str>) -> String {
    if alpha == 0 {
        t_lang("alpha-auto", language)
    } else {
        alpha.to_string()
    }
}

/// Menu callback leading back to the picker of `field`
pub fn picker_callback(field: InputField) -> Callback {
    match field {
        InputField::Iterations => Callback::IterationsMenu,
        InputField::Alpha => Callback::AlphaMenu,
        InputField::Size => Callback::SizeMenu,
    }
}

/// Prompt shown while waiting for a typed value
pub fn input_prompt(field: InputField, language: Option<&str>) -> String {
    let key = match field {
        InputField::Iterations => "input-iterations",
        InputField::Alpha => "input-alpha",
        InputField::Size => "input-size",
    };
    let range = field.range();
    t_args_lang(
        key,
        &[
            ("min", &range.start().to_string()),
            ("max", &range.end().to_string()),
        ],
        language,
    )
}

/// Prompt shown after a typed value was rejected
pub fn invalid_input_prompt(field: InputField, input: &str, language: Option<&str>) -> String {
    let range = field.range();
    t_args_lang(
        "input-invalid",
        &[
            ("input", input.trim()),
            ("min", &range.start().to_string()),
            ("max", &range.end().to_string()),
        ],
        language,
    )
}

/// Keyboard shown under an input prompt
pub fn input_keyboard(field: InputField, language: Option<&str>) -> Keyboard {
    vec![back_row(picker_callback(field), language)]
}

/// Text and keyboard of the menu screen for `activity`
pub fn render_screen(activity: Activity, config: &RenderConfig, language: Option<&str>) -> (String, Keyboard) {
    let t = |key: &str| t_lang(key, language);

    match activity {
        Activity::Root => (
            t("menu-root"),
            vec![vec![
                Button::new(t("button-create"), Callback::Create),
                Button::new(t("button-settings"), Callback::Settings),
            ]],
        ),
        Activity::Settings => (
            t("menu-settings"),
            vec![
                vec![
                    Button::new(t("button-shapes"), Callback::ShapesMenu),
                    Button::new(
                        format!("{} ({})", t("button-iterations"), config.iterations),
                        Callback::IterationsMenu,
                    ),
                    Button::new(
                        format!("{} ({})", t("button-repetitions"), config.repeat),
                        Callback::RepetitionsMenu,
                    ),
                ],
                vec![
                    Button::new(
                        format!("{} ({})", t("button-alpha"), alpha_label(config.alpha, language)),
                        Callback::AlphaMenu,
                    ),
                    Button::new(
                        format!("{} ({})", t("button-extension"), config.extension),
                        Callback::ExtensionMenu,
                    ),
                    Button::new(
                        format!("{} ({})", t("button-size"), config.output_size),
                        Callback::SizeMenu,
                    ),
                ],
                back_row(Callback::Root, language),
            ],
        ),
        Activity::Shapes => {
            let mut rows: Keyboard = Shape::ALL
                .into_iter()
                .map(|shape| {
                    vec![Button::new(
                        option_label(shape_name(shape, language), shape == config.shape),
                        Callback::Shape(shape),
                    )]
                })
                .collect();
            rows.push(back_row(Callback::Settings, language));
            (t("menu-shapes"), rows)
        }
        Activity::Iterations => {
            let presets: Vec<Button> = ITERATION_PRESETS
                .into_iter()
                .map(|n| Button::new(option_label(n.to_string(), n == config.iterations), Callback::Iterations(n)))
                .collect();
            let mut rows: Keyboard = presets.chunks(3).map(<[Button]>::to_vec).collect();
            rows.push(vec![Button::new(t("button-input"), Callback::IterationsInput)]);
            rows.push(back_row(Callback::Settings, language));
            (t("menu-iterations"), rows)
        }
        Activity::Repetitions => {
            let presets: Vec<Button> = REPETITION_PRESETS
                .into_iter()
                .map(|n| Button::new(option_label(n.to_string(), n == config.repeat), Callback::Repetitions(n)))
                .collect();
            let mut rows: Keyboard = presets.chunks(3).map(<[Button]>::to_vec).collect();
            rows.push(back_row(Callback::Settings, language));
            (t("menu-repetitions"), rows)
        }
        Activity::Alpha => {
            let mut rows = vec![vec![Button::new(
                option_label(t("alpha-auto"), config.alpha == 0),
                Callback::Alpha(0),
            )]];
            rows.push(
                ALPHA_PRESETS
                    .into_iter()
                    .map(|n| Button::new(option_label(n.to_string(), n == config.alpha), Callback::Alpha(n)))
                    .collect(),
            );
            rows.push(vec![Button::new(t("button-input"), Callback::AlphaInput)]);
            rows.push(back_row(Callback::Settings, language));
            (t("menu-alpha"), rows)
        }
        Activity::Extension => {
            let row: Vec<Button> = Extension::ALL
                .into_iter()
                .map(|ext| Button::new(option_label(ext.as_str(), ext == config.extension), Callback::Extension(ext)))
                .collect();
            (t("menu-extension"), vec![row, back_row(Callback::Settings, language)])
        }
        Activity::Size => {
            let presets: Vec<Button> = SIZE_PRESETS
                .into_iter()
                .map(|n| Button::new(option_label(n.to_string(), n == config.output_size), Callback::Size(n)))
                .collect();
            let mut rows: Keyboard = presets.chunks(3).map(<[Button]>::to_vec).collect();
            rows.push(vec![Button::new(t("button-input"), Callback::SizeInput)]);
            rows.push(back_row(Callback::Settings, language));
            (t("menu-size"), rows)
        }
        Activity::AwaitingInput(field) => (input_prompt(field, language), input_keyboard(field, language)),
    }
}

/// Status line for one queued job
pub fn format_status(config: &RenderConfig, position: usize, language: Option<&str>) -> String {
    t_args_lang(
        "status-item",
        &[
            ("position", &position.to_string()),
            ("shape", &shape_name(config.shape, language)),
            ("iterations", &config.iterations.to_string()),
            ("repeat", &config.repeat.to_string()),
            ("alpha", &alpha_label(config.alpha, language)),
            ("size", &config.output_size.to_string()),
            ("extension", config.extension.as_str()),
        ],
        language,
    )
}
