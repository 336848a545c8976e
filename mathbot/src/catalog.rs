//! Canned examples offered in the menus.

use once_cell::sync::Lazy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Arithmetic,
    Equations,
    Calculus,
    Series,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Arithmetic,
        Category::Equations,
        Category::Calculus,
        Category::Series,
    ];

    pub const fn code(&self) -> &'static str {
        match self {
            Category::Arithmetic => "arith",
            Category::Equations => "eq",
            Category::Calculus => "calc",
            Category::Series => "series",
        }
    }

    pub const fn title(&self) -> &'static str {
        match self {
            Category::Arithmetic => "🔢 Арифметика",
            Category::Equations => "⚖️ Уравнения и неравенства",
            Category::Calculus => "📈 Анализ",
            Category::Series => "∑ Ряды и факториалы",
        }
    }

    pub fn from_code(code: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.code() == code)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Example {
    pub category: Category,
    pub expression: &'static str,
    pub description: &'static str,
}

const EXAMPLES: &[(Category, &str, &str)] = &[
    (Category::Arithmetic, "2+2*2", "порядок действий"),
    (Category::Arithmetic, "(15-3)/4", "скобки"),
    (Category::Arithmetic, "sqrt(16)", "квадратный корень"),
    (Category::Arithmetic, "pi*2", "константы"),
    (Category::Arithmetic, "1/3 + 1/6", "дроби"),
    (Category::Equations, "x^2-4=0", "квадратное уравнение"),
    (Category::Equations, "2*x + 3 = 11", "линейное уравнение"),
    (Category::Equations, "x^3 - 6*x^2 + 11*x - 6 = 0", "кубическое уравнение"),
    (Category::Equations, "x^2 < 9", "неравенство"),
    (Category::Calculus, "diff x^3", "производная"),
    (Category::Calculus, "diff(sin(x)*x, x)", "производная произведения"),
    (Category::Calculus, "integrate x^2 dx", "неопределённый интеграл"),
    (Category::Calculus, "integrate(x^2, (x, 0, 1))", "определённый интеграл"),
    (Category::Calculus, "limit sin(x)/x, x->0", "замечательный предел"),
    (Category::Series, "Sum n", "сумма 1..10"),
    (Category::Series, "Sum(1/k^2, (k, 1, 5))", "сумма с границами"),
    (Category::Series, "Product n", "произведение 1..5"),
    (Category::Series, "5!", "факториал"),
];

static CATALOG: Lazy<Vec<Example>> = Lazy::new(|| {
    EXAMPLES
        .iter()
        .map(|&(category, expression, description)| Example {
            category,
            expression,
            description,
        })
        .collect()
});

pub fn catalog() -> &'static [Example] {
    &CATALOG
}

pub fn examples_in(category: Category) -> impl Iterator<Item = &'static Example> {
    catalog().iter().filter(move |e| e.category == category)
}
