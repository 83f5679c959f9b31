//! Immutable widget descriptors.
//!
//! A [`Widget`] is a plain value describing intended UI for one frame.
//! The application builds a fresh tree every frame; the reconciler in
//! [`crate::node`] diffs it against the persistent node tree. The
//! variant set is closed: measure, arrange, and render all dispatch on
//! the tag.

use std::fmt;
use std::sync::Arc;

use braid_term::Style;

use crate::error::Result;
use crate::layout::LayoutHints;

/// A cloneable, optional callback carried in widget configuration.
///
/// Handlers compare equal regardless of contents so widget configs can
/// be compared structurally without inspecting closures.
pub struct Handler<A>(Option<Arc<dyn Fn(A) -> Result<()> + Send + Sync>>);

impl<A> Handler<A> {
    /// An unset handler.
    pub fn none() -> Self {
        Self(None)
    }

    /// Wrap a closure.
    pub fn new(f: impl Fn(A) -> Result<()> + Send + Sync + 'static) -> Self {
        Self(Some(Arc::new(f)))
    }

    /// Invoke the handler if set.
    pub fn call(&self, arg: A) -> Result<()> {
        match &self.0 {
            Some(f) => f(arg),
            None => Ok(()),
        }
    }

    /// Whether a closure is attached.
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl<A> Clone for Handler<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A> Default for Handler<A> {
    fn default() -> Self {
        Self::none()
    }
}

impl<A> fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_set() { "Handler(set)" } else { "Handler(unset)" })
    }
}

/// The widget variant tag, used by the reconciler to decide whether a
/// node survives a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// Vertical stack.
    VStack,
    /// Horizontal stack.
    HStack,
    /// Depth stack (layers).
    ZStack,
    /// Text block.
    Text,
    /// Push button.
    Button,
    /// Border around one child.
    Border,
    /// Scrollable region.
    Scroll,
    /// Selectable list.
    List,
    /// Horizontal option picker.
    Picker,
    /// Data table.
    Table,
    /// Single-line text input.
    TextBox,
    /// Activity spinner.
    Spinner,
    /// Progress bar.
    Progress,
    /// Two-pane splitter.
    Splitter,
    /// Breakpoint-based selector.
    Responsive,
    /// Error boundary.
    Rescue,
}

/// Stack configuration (vertical, horizontal, or depth).
#[derive(Clone, Debug, Default)]
pub struct StackConfig {
    /// Children in document order.
    pub children: Vec<Widget>,
    /// Sizing hints for this stack within its parent.
    pub hints: LayoutHints,
}

/// Text block configuration.
#[derive(Clone, Debug, Default)]
pub struct TextConfig {
    /// The text; newlines split lines.
    pub text: String,
    /// Style applied to every cell.
    pub style: Style,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// Button configuration.
#[derive(Clone, Debug, Default)]
pub struct ButtonConfig {
    /// Button label.
    pub label: String,
    /// Invoked when the button is activated.
    pub on_press: Handler<()>,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// Border configuration.
#[derive(Clone, Debug)]
pub struct BorderConfig {
    /// The wrapped child.
    pub child: Box<Widget>,
    /// Optional title drawn into the top edge.
    pub title: Option<String>,
    /// Style of the border cells.
    pub style: Style,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// Scroll region configuration.
#[derive(Clone, Debug)]
pub struct ScrollConfig {
    /// The scrolled child.
    pub child: Box<Widget>,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// List configuration.
#[derive(Clone, Debug, Default)]
pub struct ListConfig {
    /// Items, one per row.
    pub items: Vec<String>,
    /// Invoked with the selected index on Enter.
    pub on_select: Handler<usize>,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// Picker configuration.
#[derive(Clone, Debug, Default)]
pub struct PickerConfig {
    /// Options cycled with Left/Right.
    pub options: Vec<String>,
    /// Invoked with the new index when the selection changes.
    pub on_pick: Handler<usize>,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// Table configuration.
#[derive(Clone, Debug, Default)]
pub struct TableConfig {
    /// Column headers.
    pub columns: Vec<String>,
    /// Row data; each row has one string per column.
    pub rows: Vec<Vec<String>>,
    /// Invoked with the selected row index on Enter.
    pub on_select: Handler<usize>,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// Text box configuration.
#[derive(Clone, Debug, Default)]
pub struct TextBoxConfig {
    /// Initial text (node state takes over after the first frame).
    pub text: String,
    /// Shown dimmed while the box is empty.
    pub placeholder: String,
    /// Invoked with the new content after each edit.
    pub on_change: Handler<String>,
    /// Invoked with the content on Enter.
    pub on_submit: Handler<String>,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// Spinner configuration.
#[derive(Clone, Debug)]
pub struct SpinnerConfig {
    /// Animation frames.
    pub frames: Vec<String>,
    /// Sizing hints.
    pub hints: LayoutHints,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            frames: ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            hints: LayoutHints::default(),
        }
    }
}

/// Progress bar configuration.
#[derive(Clone, Debug, Default)]
pub struct ProgressConfig {
    /// Completion in `[0.0, 1.0]`.
    pub fraction: f32,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// Split direction for [`SplitterConfig`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitDirection {
    /// Panes side by side.
    #[default]
    Horizontal,
    /// Panes stacked.
    Vertical,
}

/// Splitter configuration.
#[derive(Clone, Debug)]
pub struct SplitterConfig {
    /// First (left/top) pane.
    pub first: Box<Widget>,
    /// Second (right/bottom) pane.
    pub second: Box<Widget>,
    /// Split direction.
    pub direction: SplitDirection,
    /// First pane's share in percent (clamped to 0..=100).
    pub ratio: u16,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// Responsive selector configuration.
#[derive(Clone, Debug)]
pub struct ResponsiveConfig {
    /// Width threshold: below it the narrow child shows.
    pub breakpoint: u16,
    /// Child for narrow layouts.
    pub narrow: Box<Widget>,
    /// Child for wide layouts.
    pub wide: Box<Widget>,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// Rescue (error boundary) configuration.
#[derive(Clone, Debug)]
pub struct RescueConfig {
    /// The guarded child.
    pub child: Box<Widget>,
    /// Shown in place of the child after a failure.
    pub fallback: Box<Widget>,
    /// Sizing hints.
    pub hints: LayoutHints,
}

/// An immutable description of intended UI.
#[derive(Clone, Debug)]
pub enum Widget {
    /// Vertical stack.
    VStack(StackConfig),
    /// Horizontal stack.
    HStack(StackConfig),
    /// Depth stack; later children render on top.
    ZStack(StackConfig),
    /// Text block.
    Text(TextConfig),
    /// Push button.
    Button(ButtonConfig),
    /// Border around one child.
    Border(BorderConfig),
    /// Scrollable region.
    Scroll(ScrollConfig),
    /// Selectable list.
    List(ListConfig),
    /// Horizontal option picker.
    Picker(PickerConfig),
    /// Data table.
    Table(TableConfig),
    /// Single-line text input.
    TextBox(TextBoxConfig),
    /// Activity spinner.
    Spinner(SpinnerConfig),
    /// Progress bar.
    Progress(ProgressConfig),
    /// Two-pane splitter.
    Splitter(SplitterConfig),
    /// Breakpoint-based selector.
    Responsive(ResponsiveConfig),
    /// Error boundary.
    Rescue(RescueConfig),
}

impl Widget {
    /// Vertical stack of children.
    pub fn vstack(children: Vec<Widget>) -> Self {
        Widget::VStack(StackConfig {
            children,
            hints: LayoutHints::default(),
        })
    }

    /// Horizontal stack of children.
    pub fn hstack(children: Vec<Widget>) -> Self {
        Widget::HStack(StackConfig {
            children,
            hints: LayoutHints::default(),
        })
    }

    /// Depth stack; later children render on top.
    pub fn zstack(children: Vec<Widget>) -> Self {
        Widget::ZStack(StackConfig {
            children,
            hints: LayoutHints::default(),
        })
    }

    /// A plain text block.
    pub fn text(text: impl Into<String>) -> Self {
        Widget::Text(TextConfig {
            text: text.into(),
            ..TextConfig::default()
        })
    }

    /// A styled text block.
    pub fn styled_text(text: impl Into<String>, style: Style) -> Self {
        Widget::Text(TextConfig {
            text: text.into(),
            style,
            hints: LayoutHints::default(),
        })
    }

    /// A button.
    pub fn button(label: impl Into<String>, on_press: Handler<()>) -> Self {
        Widget::Button(ButtonConfig {
            label: label.into(),
            on_press,
            hints: LayoutHints::default(),
        })
    }

    /// A border around a child.
    pub fn border(child: Widget) -> Self {
        Widget::Border(BorderConfig {
            child: Box::new(child),
            title: None,
            style: Style::default(),
            hints: LayoutHints::default(),
        })
    }

    /// A scroll region around a child.
    pub fn scroll(child: Widget) -> Self {
        Widget::Scroll(ScrollConfig {
            child: Box::new(child),
            hints: LayoutHints::default(),
        })
    }

    /// A list of items.
    pub fn list(items: Vec<String>) -> Self {
        Widget::List(ListConfig {
            items,
            ..ListConfig::default()
        })
    }

    /// A single-line text box seeded with `text`.
    pub fn text_box(text: impl Into<String>) -> Self {
        Widget::TextBox(TextBoxConfig {
            text: text.into(),
            ..TextBoxConfig::default()
        })
    }

    /// An error boundary showing `fallback` if `child` fails.
    pub fn rescue(child: Widget, fallback: Widget) -> Self {
        Widget::Rescue(RescueConfig {
            child: Box::new(child),
            fallback: Box::new(fallback),
            hints: LayoutHints::default(),
        })
    }

    /// The variant tag.
    pub fn kind(&self) -> WidgetKind {
        match self {
            Widget::VStack(_) => WidgetKind::VStack,
            Widget::HStack(_) => WidgetKind::HStack,
            Widget::ZStack(_) => WidgetKind::ZStack,
            Widget::Text(_) => WidgetKind::Text,
            Widget::Button(_) => WidgetKind::Button,
            Widget::Border(_) => WidgetKind::Border,
            Widget::Scroll(_) => WidgetKind::Scroll,
            Widget::List(_) => WidgetKind::List,
            Widget::Picker(_) => WidgetKind::Picker,
            Widget::Table(_) => WidgetKind::Table,
            Widget::TextBox(_) => WidgetKind::TextBox,
            Widget::Spinner(_) => WidgetKind::Spinner,
            Widget::Progress(_) => WidgetKind::Progress,
            Widget::Splitter(_) => WidgetKind::Splitter,
            Widget::Responsive(_) => WidgetKind::Responsive,
            Widget::Rescue(_) => WidgetKind::Rescue,
        }
    }

    /// Child widgets in document order.
    pub fn children(&self) -> Vec<&Widget> {
        match self {
            Widget::VStack(c) | Widget::HStack(c) | Widget::ZStack(c) => {
                c.children.iter().collect()
            }
            Widget::Border(c) => vec![c.child.as_ref()],
            Widget::Scroll(c) => vec![c.child.as_ref()],
            Widget::Splitter(c) => vec![c.first.as_ref(), c.second.as_ref()],
            Widget::Responsive(c) => vec![c.narrow.as_ref(), c.wide.as_ref()],
            Widget::Rescue(c) => vec![c.child.as_ref(), c.fallback.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Sizing hints for this widget within its parent.
    pub fn hints(&self) -> LayoutHints {
        match self {
            Widget::VStack(c) | Widget::HStack(c) | Widget::ZStack(c) => c.hints,
            Widget::Text(c) => c.hints,
            Widget::Button(c) => c.hints,
            Widget::Border(c) => c.hints,
            Widget::Scroll(c) => c.hints,
            Widget::List(c) => c.hints,
            Widget::Picker(c) => c.hints,
            Widget::Table(c) => c.hints,
            Widget::TextBox(c) => c.hints,
            Widget::Spinner(c) => c.hints,
            Widget::Progress(c) => c.hints,
            Widget::Splitter(c) => c.hints,
            Widget::Responsive(c) => c.hints,
            Widget::Rescue(c) => c.hints,
        }
    }

    /// Replace the sizing hints (builder style).
    #[must_use]
    pub fn with_hints(mut self, hints: LayoutHints) -> Self {
        match &mut self {
            Widget::VStack(c) | Widget::HStack(c) | Widget::ZStack(c) => c.hints = hints,
            Widget::Text(c) => c.hints = hints,
            Widget::Button(c) => c.hints = hints,
            Widget::Border(c) => c.hints = hints,
            Widget::Scroll(c) => c.hints = hints,
            Widget::List(c) => c.hints = hints,
            Widget::Picker(c) => c.hints = hints,
            Widget::Table(c) => c.hints = hints,
            Widget::TextBox(c) => c.hints = hints,
            Widget::Spinner(c) => c.hints = hints,
            Widget::Progress(c) => c.hints = hints,
            Widget::Splitter(c) => c.hints = hints,
            Widget::Responsive(c) => c.hints = hints,
            Widget::Rescue(c) => c.hints = hints,
        }
        self
    }

    /// Whether nodes of this variant join the focus ring.
    pub fn is_focusable(&self) -> bool {
        matches!(
            self.kind(),
            WidgetKind::Button
                | WidgetKind::List
                | WidgetKind::Picker
                | WidgetKind::Table
                | WidgetKind::TextBox
        )
    }
}
