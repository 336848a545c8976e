//! Inline keyboards built from the catalog and the glossary.

use mathbot::{catalog::examples_in, glossary, symbols::PatternKind, Callback, Category};

use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

const SYMBOLS_PER_ROW: usize = 8;

fn button(text: &str, callback: &Callback) -> Option<InlineKeyboardButton> {
    Some(InlineKeyboardButton {
        text: text.to_owned(),
        callback_data: callback.encode()?,
    })
}

fn back() -> Vec<InlineKeyboardButton> {
    button("⬅️ Назад", &Callback::ExamplesMenu).into_iter().collect()
}

pub fn welcome() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![[
            button("🧮 Примеры", &Callback::ExamplesMenu),
            button("🔣 Символы", &Callback::SymbolsMenu),
        ]
        .into_iter()
        .flatten()
        .collect()],
    }
}

pub fn categories() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: Category::ALL
            .iter()
            .filter_map(|c| button(c.title(), &Callback::Category(*c)))
            .map(|b| vec![b])
            .collect(),
    }
}

/// One button per example; pressing it computes the example.
pub fn examples(category: Category) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<_>> = examples_in(category)
        .filter_map(|e| button(e.expression, &Callback::Calculate(e.expression.to_owned())))
        .map(|b| vec![b])
        .collect();
    rows.push(back());
    InlineKeyboardMarkup {
        inline_keyboard: rows,
    }
}

/// Every glyph alias, in rows.
pub fn symbols() -> InlineKeyboardMarkup {
    let buttons: Vec<_> = glossary()
        .iter()
        .filter(|e| e.kind == PatternKind::Glyph)
        .filter_map(|e| button(&e.pattern, &Callback::Symbol(e.code.clone())))
        .collect();
    InlineKeyboardMarkup {
        inline_keyboard: buttons.chunks(SYMBOLS_PER_ROW).map(<[_]>::to_vec).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_opens_the_menus() {
        let data: Vec<_> = welcome().inline_keyboard[0]
            .iter()
            .map(|b| b.callback_data.clone())
            .collect();
        assert_eq!(data, ["menu_examples", "menu_symbols"]);
    }

    #[test]
    fn every_button_round_trips() {
        let mut keyboards = vec![welcome(), categories(), symbols()];
        keyboards.extend(Category::ALL.map(examples));
        for keyboard in keyboards {
            for button in keyboard.inline_keyboard.iter().flatten() {
                assert!(button.callback_data.len() <= mathbot::callback::MAX_CALLBACK_BYTES);
                assert!(Callback::parse(&button.callback_data).is_some(), "{}", button.callback_data);
            }
        }
    }

    #[test]
    fn symbol_rows_are_bounded() {
        let keyboard = symbols();
        assert!(keyboard.inline_keyboard.iter().all(|row| row.len() <= SYMBOLS_PER_ROW));
        assert!(keyboard.inline_keyboard.iter().flatten().count() <= 100);
    }
}
