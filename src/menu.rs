//! # Menu State Machine Module
//!
//! Inline-button callbacks are parsed once into a [`Callback`] and applied
//! to the session's current [`Activity`] by [`transition`]. The module holds
//! no state; the session it reads and writes lives in the session store.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::render::{
    Extension, RenderConfig, Shape, ALPHA_RANGE, ITERATIONS_RANGE, REPEAT_RANGE, SIZE_RANGE,
};

static SETTINGS_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/settings/(shape|iter|rep|alpha|ext|size)(?:/([a-z0-9]+))?$")
        .expect("callback token pattern is valid")
});

/// Numeric setting that can be typed in as free text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    Iterations,
    Alpha,
    Size,
}

impl InputField {
    pub fn range(self) -> std::ops::RangeInclusive<u32> {
        match self {
            InputField::Iterations => ITERATIONS_RANGE,
            InputField::Alpha => ALPHA_RANGE,
            InputField::Size => SIZE_RANGE,
        }
    }

    /// Picker screen the input prompt was opened from
    pub fn picker(self) -> Activity {
        match self {
            InputField::Iterations => Activity::Iterations,
            InputField::Alpha => Activity::Alpha,
            InputField::Size => Activity::Size,
        }
    }

    /// Store a validated value into `config`
    pub fn apply(self, config: &mut RenderConfig, value: u32) {
        match self {
            InputField::Iterations => config.iterations = value,
            InputField::Alpha => config.alpha = u8::try_from(value).unwrap_or(u8::MAX),
            InputField::Size => config.output_size = value,
        }
    }

    /// Parse and range-check typed text
    pub fn parse(self, text: &str) -> Result<u32, InputError> {
        let value: u32 = text
            .trim()
            .parse()
            .map_err(|_| InputError::NotANumber)?;
        if self.range().contains(&value) {
            Ok(value)
        } else {
            Err(InputError::OutOfRange)
        }
    }
}

/// Why typed text was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    NotANumber,
    OutOfRange,
}

/// Position of a session in the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Activity {
    #[default]
    Root,
    Settings,
    Shapes,
    Iterations,
    Repetitions,
    Alpha,
    Extension,
    Size,
    AwaitingInput(InputField),
}

/// A parsed callback token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Root,
    Create,
    Settings,
    ShapesMenu,
    Shape(Shape),
    IterationsMenu,
    Iterations(u32),
    IterationsInput,
    RepetitionsMenu,
    Repetitions(u32),
    AlphaMenu,
    Alpha(u8),
    AlphaInput,
    ExtensionMenu,
    Extension(Extension),
    SizeMenu,
    Size(u32),
    SizeInput,
}

impl Callback {
    /// Parse a raw callback token. Unknown or out-of-range tokens give `None`.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "/" => return Some(Callback::Root),
            "/create" => return Some(Callback::Create),
            "/settings" => return Some(Callback::Settings),
            _ => {}
        }

        let caps = SETTINGS_TOKEN.captures(token)?;
        let section = caps.get(1)?.as_str();
        let Some(arg) = caps.get(2).map(|m| m.as_str()) else {
            return Some(match section {
                "shape" => Callback::ShapesMenu,
                "iter" => Callback::IterationsMenu,
                "rep" => Callback::RepetitionsMenu,
                "alpha" => Callback::AlphaMenu,
                "ext" => Callback::ExtensionMenu,
                _ => Callback::SizeMenu,
            });
        };

        match (section, arg) {
            ("iter", "input") => Some(Callback::IterationsInput),
            ("alpha", "input") => Some(Callback::AlphaInput),
            ("size", "input") => Some(Callback::SizeInput),
            ("shape", code) => code.parse().ok().and_then(Shape::from_code).map(Callback::Shape),
            ("ext", ext) => ext.parse().ok().map(Callback::Extension),
            ("iter", n) => in_range(n, ITERATIONS_RANGE).map(Callback::Iterations),
            ("rep", n) => in_range(n, REPEAT_RANGE).map(Callback::Repetitions),
            // 0 selects automatic alpha
            ("alpha", n) => n.parse::<u8>().ok().map(Callback::Alpha),
            ("size", n) => in_range(n, SIZE_RANGE).map(Callback::Size),
            _ => None,
        }
    }
}

fn in_range(raw: &str, range: std::ops::RangeInclusive<u32>) -> Option<u32> {
    raw.parse().ok().filter(|n| range.contains(n))
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Root => f.write_str("/"),
            Callback::Create => f.write_str("/create"),
            Callback::Settings => f.write_str("/settings"),
            Callback::ShapesMenu => f.write_str("/settings/shape"),
            Callback::Shape(s) => write!(f, "/settings/shape/{}", s.code()),
            Callback::IterationsMenu => f.write_str("/settings/iter"),
            Callback::Iterations(n) => write!(f, "/settings/iter/{n}"),
            Callback::IterationsInput => f.write_str("/settings/iter/input"),
            Callback::RepetitionsMenu => f.write_str("/settings/rep"),
            Callback::Repetitions(n) => write!(f, "/settings/rep/{n}"),
            Callback::AlphaMenu => f.write_str("/settings/alpha"),
            Callback::Alpha(n) => write!(f, "/settings/alpha/{n}"),
            Callback::AlphaInput => f.write_str("/settings/alpha/input"),
            Callback::ExtensionMenu => f.write_str("/settings/ext"),
            Callback::Extension(e) => write!(f, "/settings/ext/{e}"),
            Callback::SizeMenu => f.write_str("/settings/size"),
            Callback::Size(n) => write!(f, "/settings/size/{n}"),
            Callback::SizeInput => f.write_str("/settings/size/input"),
        }
    }
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Redraw the menu for the next activity
    Render,
    /// Submit a generation job with the current config
    Enqueue,
    /// Start waiting for a typed value
    AwaitInput(InputField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Activity,
    pub effect: Effect,
}

impl Transition {
    fn render(next: Activity) -> Option<Self> {
        Some(Self {
            next,
            effect: Effect::Render,
        })
    }
}

/// Apply `callback` to a session at `activity`.
///
/// Navigation is accepted from anywhere. Creating a job is accepted from the
/// root screen, and picking or typing a value only from the matching picker.
/// Anything else yields `None` and leaves `config` untouched.
pub fn transition(activity: Activity, config: &mut RenderConfig, callback: Callback) -> Option<Transition> {
    use Activity as A;
    use Callback as C;

    match (activity, callback) {
        (_, C::Root) => Transition::render(A::Root),
        (_, C::Settings) => Transition::render(A::Settings),
        (_, C::ShapesMenu) => Transition::render(A::Shapes),
        (_, C::IterationsMenu) => Transition::render(A::Iterations),
        (_, C::RepetitionsMenu) => Transition::render(A::Repetitions),
        (_, C::AlphaMenu) => Transition::render(A::Alpha),
        (_, C::ExtensionMenu) => Transition::render(A::Extension),
        (_, C::SizeMenu) => Transition::render(A::Size),

        (A::Root, C::Create) => Some(Transition {
            next: A::Root,
            effect: Effect::Enqueue,
        }),

        (A::Shapes, C::Shape(shape)) => {
            config.shape = shape;
            Transition::render(A::Settings)
        }
        (A::Iterations, C::Iterations(n)) => {
            config.iterations = n;
            Transition::render(A::Settings)
        }
        (A::Repetitions, C::Repetitions(n)) => {
            config.repeat = n;
            Transition::render(A::Settings)
        }
        (A::Alpha, C::Alpha(n)) => {
            config.alpha = n;
            Transition::render(A::Settings)
        }
        (A::Extension, C::Extension(ext)) => {
            config.extension = ext;
            Transition::render(A::Settings)
        }
        (A::Size, C::Size(n)) => {
            config.output_size = n;
            Transition::render(A::Settings)
        }

        (A::Iterations, C::IterationsInput) => await_input(InputField::Iterations),
        (A::Alpha, C::AlphaInput) => await_input(InputField::Alpha),
        (A::Size, C::SizeInput) => await_input(InputField::Size),

        _ => None,
    }
}

fn await_input(field: InputField) -> Option<Transition> {
    Some(Transition {
        next: Activity::AwaitingInput(field),
        effect: Effect::AwaitInput(field),
    })
}
