//! Paginated text menu for picking one or more items from a list.
//!
//! Each round prints the current page, reads one line and applies the
//! matching [`Action`]. Items are numbered continuously across pages, but
//! only numbers visible on the current page are accepted.

use anyhow::Result;
use std::fmt;
use std::io::{BufRead, Write};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Input ran out while the menu was waiting for a choice.
#[derive(Debug, Error)]
#[error("Unexpected end of input. Is stdin connected to a terminal?")]
pub struct EndOfInput;

/// What one line of input asks the menu to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Toggle the item at this index of the whole list
    Toggle(usize),
    NextPage,
    PrevPage,
    Refresh,
    Finish,
    Invalid,
}

type Provider<'a, T> = Box<dyn FnMut() -> Result<Vec<T>> + 'a>;
type Formatter<'a, T> = Box<dyn Fn(&T) -> String + 'a>;

pub struct TextMenu<'a, T> {
    items: Vec<T>,
    provider: Option<Provider<'a, T>>,
    formatter: Formatter<'a, T>,
    header: Option<String>,
    multi: bool,
    page_size: usize,
    page: usize,
    selected: Vec<T>,
    done: bool,
}

impl<'a, T> TextMenu<'a, T>
where
    T: Clone + PartialEq + fmt::Display + 'a,
{
    /// Menu over a fixed list.
    pub fn new(items: Vec<T>) -> Self {
        Self::with_formatter(items, |item: &T| item.to_string())
    }

    /// Menu whose items come from `provider`, called now and on every refresh.
    pub fn with_provider(provider: impl FnMut() -> Result<Vec<T>> + 'a) -> Result<Self> {
        let mut menu = Self::new(Vec::new());
        menu.provider = Some(Box::new(provider));
        menu.refresh()?;
        Ok(menu)
    }
}

impl<'a, T> TextMenu<'a, T>
where
    T: Clone + PartialEq,
{
    /// Menu over a fixed list, each item shown through `formatter`.
    pub fn with_formatter(items: Vec<T>, formatter: impl Fn(&T) -> String + 'a) -> Self {
        Self {
            items,
            provider: None,
            formatter: Box::new(formatter),
            header: None,
            multi: false,
            page_size: DEFAULT_PAGE_SIZE,
            page: 1,
            selected: Vec::new(),
            done: false,
        }
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[cfg(test)]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Selected items, in the order they were picked.
    pub fn selected(&self) -> &[T] {
        &self.selected
    }

    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_refreshable(&self) -> bool {
        self.provider.is_some()
    }

    pub fn num_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size)
    }

    /// Current page, starting at 1.
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn next_page(&mut self) {
        if self.page < self.num_pages() {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
        }
    }

    /// Reload items from the provider. Selections are kept as they are, even
    /// when the selected items are no longer listed.
    pub fn refresh(&mut self) -> Result<()> {
        if let Some(provider) = self.provider.as_mut() {
            self.items = provider()?;
            self.page = self.page.min(self.num_pages()).max(1);
        }
        Ok(())
    }

    /// Select or deselect the item at `index`. In single-select mode any pick
    /// ends the menu with that item as the only selection.
    pub fn toggle(&mut self, index: usize) {
        let Some(item) = self.items.get(index).cloned() else {
            return;
        };

        if !self.multi {
            self.selected = vec![item];
            self.done = true;
            return;
        }

        match self.selected.iter().position(|s| *s == item) {
            Some(pos) => {
                self.selected.remove(pos);
            }
            None => self.selected.push(item),
        }
    }

    pub fn finish(&mut self) {
        self.done = true;
    }

    /// Clear selections and go back to the first page so the menu can run again.
    pub fn reset(&mut self) {
        self.selected.clear();
        self.done = false;
        self.page = 1;
    }

    /// Index range of the items shown on the current page.
    pub fn page_range(&self) -> std::ops::Range<usize> {
        let start = ((self.page - 1) * self.page_size).min(self.items.len());
        let end = (start + self.page_size).min(self.items.len());
        start..end
    }

    pub fn items_on_page(&self) -> impl Iterator<Item = (usize, &T)> {
        let range = self.page_range();
        self.items[range.clone()]
            .iter()
            .enumerate()
            .map(move |(i, item)| (range.start + i, item))
    }

    pub fn parse_action(&self, input: &str) -> Action {
        match input.trim() {
            "n" => Action::NextPage,
            "p" => Action::PrevPage,
            "r" => Action::Refresh,
            "c" => Action::Finish,
            other => match other.parse::<usize>() {
                Ok(n) if n >= 1 && self.page_range().contains(&(n - 1)) => Action::Toggle(n - 1),
                _ => Action::Invalid,
            },
        }
    }

    /// Apply one action. `Invalid` leaves the menu untouched.
    pub fn apply(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Toggle(index) => self.toggle(index),
            Action::NextPage => self.next_page(),
            Action::PrevPage => self.prev_page(),
            Action::Refresh => self.refresh()?,
            Action::Finish => self.finish(),
            Action::Invalid => {}
        }
        Ok(())
    }

    pub fn format_page(&self) -> String {
        let items: Vec<String> = self
            .items_on_page()
            .map(|(n, item)| {
                let text = (self.formatter)(item);
                if self.multi {
                    let mark = if self.selected.contains(item) { 'x' } else { ' ' };
                    format!("{:3}) [{}] {}", n + 1, mark, text)
                } else {
                    format!("{:3}) {}", n + 1, text)
                }
            })
            .collect();

        format!(
            "\nPage {} of {}\n{}\n{}",
            self.page,
            self.num_pages().max(1),
            self.header.as_deref().unwrap_or(""),
            items.join("\n")
        )
    }

    /// The footer listing what can be typed right now.
    pub fn format_prompt(&self) -> String {
        let mut options = vec![if self.multi {
            "# to toggle selection"
        } else {
            "# to select"
        }];
        if self.is_refreshable() {
            options.push("'r'-refresh");
        }
        if self.page < self.num_pages() {
            options.push("'n'-next page");
        }
        if self.page > 1 {
            options.push("'p'-previous page");
        }
        options.push("or 'c'-continue");

        format!("{}: ", options.join(", "))
    }

    /// Show pages and read actions until the menu is done. Returns the selection.
    pub fn run(&mut self, input: &mut dyn BufRead, output: &mut dyn Write) -> Result<Vec<T>> {
        while !self.done {
            writeln!(output, "{}", self.format_page())?;
            write!(output, "{}", self.format_prompt())?;
            output.flush()?;

            let mut line = Vec::new();
            if input.read_until(b'\n', &mut line)? == 0 {
                return Err(EndOfInput.into());
            }

            match self.parse_action(&String::from_utf8_lossy(&line)) {
                Action::Invalid => writeln!(output, "Invalid selection")?,
                action => self.apply(action)?,
            }
        }

        Ok(self.selected.clone())
    }
}
