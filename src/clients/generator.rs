//! Random but plausible client data for seeding.

use chrono::{Days, Months, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::clients::model::{Currency, Nationality, NewClient};

/// Base of the sequential seed account numbers.
pub const SEED_ACCOUNT_BASE: u64 = 10_000_000_000_000_000_000;

const MALE_FIRST_NAMES: &[&str] = &[
    "Александр", "Сергей", "Владимир", "Андрей", "Алексей", "Дмитрий", "Михаил", "Иван",
    "Максим", "Николай", "Евгений", "Павел", "Артем", "Виктор", "Константин", "Игорь", "Олег",
    "Роман", "Денис", "Антон", "Илья", "Юрий", "Григорий", "Василий", "Петр", "Егор", "Георгий",
    "Кирилл", "Арсений", "Леонид",
];

const FEMALE_FIRST_NAMES: &[&str] = &[
    "Елена", "Ольга", "Наталья", "Татьяна", "Ирина", "Светлана", "Марина", "Анна", "Людмила",
    "Екатерина", "Мария", "Галина", "Валентина", "Надежда", "Юлия", "Александра", "Любовь",
    "Лариса", "Вера", "Алина", "Дарья", "Анастасия", "Виктория", "Ксения", "Полина", "София",
    "Алиса", "Евгения", "Вероника", "Маргарита",
];

const MALE_MIDDLE_NAMES: &[&str] = &[
    "Александрович", "Сергеевич", "Владимирович", "Андреевич", "Алексеевич", "Дмитриевич",
    "Михайлович", "Иванович", "Николаевич", "Павлович", "Викторович", "Константинович",
    "Игоревич", "Олегович", "Романович", "Денисович", "Антонович", "Ильич", "Юрьевич",
    "Петрович", "Васильевич", "Георгиевич", "Кириллович", "Леонидович", "Артемович",
];

const FEMALE_MIDDLE_NAMES: &[&str] = &[
    "Александровна", "Сергеевна", "Владимировна", "Андреевна", "Алексеевна", "Дмитриевна",
    "Михайловна", "Ивановна", "Николаевна", "Павловна", "Викторовна", "Константиновна",
    "Игоревна", "Олеговна", "Романовна", "Денисовна", "Антоновна", "Ильинична", "Юрьевна",
    "Петровна", "Васильевна", "Георгиевна", "Кирилловна", "Леонидовна", "Артемовна",
];

/// Masculine forms; the feminine form appends `а`.
const LAST_NAMES: &[&str] = &[
    "Иванов", "Смирнов", "Кузнецов", "Попов", "Васильев", "Петров", "Соколов", "Михайлов",
    "Новиков", "Федоров", "Морозов", "Волков", "Алексеев", "Лебедев", "Семенов", "Егоров",
    "Павлов", "Козлов", "Степанов", "Николаев", "Орлов", "Андреев", "Макаров", "Никитин",
    "Захаров", "Зайцев", "Соловьев", "Борисов", "Яковлев", "Григорьев", "Романов", "Воробьев",
    "Сергеев", "Кузьмин", "Фролов", "Александров", "Дмитриев", "Королев", "Гусев", "Киселев",
    "Максимов", "Поляков", "Сорокин", "Виноградов", "Ковалев", "Белов", "Медведев", "Антонов",
    "Тарасов", "Жуков", "Баранов", "Филиппов", "Комаров", "Давыдов", "Беляев", "Герасимов",
];

const INTERNATIONAL_FIRST_NAMES: &[&str] = &[
    "John", "James", "Robert", "Michael", "William", "David", "Richard", "Joseph", "Thomas",
    "Charles", "Mary", "Patricia", "Jennifer", "Linda", "Elizabeth", "Barbara", "Susan",
    "Jessica", "Sarah", "Karen", "Hans", "Peter", "Klaus", "Wolfgang", "Dieter", "Jean",
    "Pierre", "Michel", "André", "Philippe",
];

const INTERNATIONAL_LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez",
    "Clark", "Ramirez", "Lewis", "Robinson",
];

/// CIS draw, repeated entries weight the pick.
const CIS_WEIGHTED: &[Nationality] = &[
    Nationality::Russia,
    Nationality::Russia,
    Nationality::Russia,
    Nationality::Kazakhstan,
    Nationality::Kazakhstan,
    Nationality::Uzbekistan,
    Nationality::Uzbekistan,
    Nationality::Belarus,
    Nationality::Ukraine,
    Nationality::Armenia,
    Nationality::Kyrgyzstan,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or("Unknown")
}

/// Russian-style full name with patronymic.
pub fn russian_name<R: Rng + ?Sized>(rng: &mut R) -> PersonName {
    let female = rng.gen_bool(0.5);
    let last = pick(rng, LAST_NAMES);
    if female {
        PersonName {
            last_name: format!("{last}а"),
            first_name: pick(rng, FEMALE_FIRST_NAMES).to_string(),
            middle_name: Some(pick(rng, FEMALE_MIDDLE_NAMES).to_string()),
        }
    } else {
        PersonName {
            last_name: last.to_string(),
            first_name: pick(rng, MALE_FIRST_NAMES).to_string(),
            middle_name: Some(pick(rng, MALE_MIDDLE_NAMES).to_string()),
        }
    }
}

/// Western name, no patronymic.
pub fn international_name<R: Rng + ?Sized>(rng: &mut R) -> PersonName {
    PersonName {
        last_name: pick(rng, INTERNATIONAL_LAST_NAMES).to_string(),
        first_name: pick(rng, INTERNATIONAL_FIRST_NAMES).to_string(),
        middle_name: None,
    }
}

/// Digits with a non-zero lead.
fn digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    let mut out = String::with_capacity(len);
    out.push(char::from(b'0' + rng.gen_range(1..=9)));
    for _ in 1..len {
        out.push(char::from(b'0' + rng.gen_range(0..=9)));
    }
    out
}

/// E.164 number with the country's calling code.
pub fn phone_number<R: Rng + ?Sized>(rng: &mut R, nationality: Nationality) -> String {
    match nationality {
        Nationality::Russia => format!("+7{}", digits(rng, 10)),
        Nationality::Usa | Nationality::Canada => format!("+1{}", digits(rng, 10)),
        Nationality::Uk => format!("+44{}", digits(rng, 10)),
        Nationality::Germany => format!("+49{}", digits(rng, 10)),
        Nationality::France => format!("+33{}", digits(rng, 9)),
        Nationality::Italy => format!("+39{}", digits(rng, 10)),
        Nationality::Spain => format!("+34{}", digits(rng, 9)),
        Nationality::China => format!("+86{}", digits(rng, 11)),
        Nationality::Japan => format!("+81{}", digits(rng, 10)),
        Nationality::Kazakhstan => format!("+7{}{}", rng.gen_range(7..=9), digits(rng, 8)),
        Nationality::Ukraine => format!("+380{}", digits(rng, 9)),
        Nationality::Belarus => format!("+375{}", digits(rng, 9)),
        Nationality::Uzbekistan => format!("+998{}", digits(rng, 9)),
        _ => format!("+1{}", digits(rng, 10)),
    }
}

/// RUB 60%, USD 25%, EUR 15%.
pub fn currency<R: Rng + ?Sized>(rng: &mut R) -> Currency {
    match rng.gen_range(0..100) {
        0..=59 => Currency::Rub,
        60..=84 => Currency::Usd,
        _ => Currency::Eur,
    }
}

/// 80% from the weighted CIS list, otherwise uniform over all.
pub fn nationality<R: Rng + ?Sized>(rng: &mut R) -> Nationality {
    let pool = if rng.gen_bool(0.8) {
        CIS_WEIGHTED
    } else {
        Nationality::ALL
    };
    pool.choose(rng).copied().unwrap_or(Nationality::Russia)
}

/// Birth date for an age between 18 and 80.
pub fn birth_date<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate) -> NaiveDate {
    let age = rng.gen_range(18..=80u32);
    let extra_days = rng.gen_range(0..365u64);
    today
        .checked_sub_months(Months::new(age * 12))
        .and_then(|d| d.checked_sub_days(Days::new(extra_days)))
        .unwrap_or(today)
}

pub fn seed_account_number(index: u64) -> String {
    (SEED_ACCOUNT_BASE + index).to_string()
}

/// A complete random client for `account_number`.
pub fn client<R: Rng + ?Sized>(rng: &mut R, account_number: String, today: NaiveDate) -> NewClient {
    let nationality = nationality(rng);
    let name = if nationality.is_cis() {
        russian_name(rng)
    } else {
        international_name(rng)
    };

    NewClient {
        unique_id: Uuid::new_v4().to_string(),
        last_name: name.last_name,
        first_name: name.first_name,
        middle_name: name.middle_name,
        birth_date: birth_date(rng, today),
        account_number,
        currency: currency(rng),
        phone_number: phone_number(rng, nationality),
        nationality,
    }
}
