//! Client record model and request/response shapes.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::clients::error::ClientError;

/// Account currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "RUB")]
    Rub,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Rub, Currency::Usd, Currency::Eur];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Rub => "RUB",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Rub => "₽",
            Currency::Usd => "$",
            Currency::Eur => "€",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Currency::Rub => "Russian ruble",
            Currency::Usd => "US dollar",
            Currency::Eur => "Euro",
        }
    }

    /// ISO 4217 numeric code.
    pub fn numeric_code(self) -> &'static str {
        match self {
            Currency::Rub => "643",
            Currency::Usd => "840",
            Currency::Eur => "978",
        }
    }

    /// e.g. `Euro (€)`.
    pub fn label(self) -> String {
        format!("{} ({})", self.display_name(), self.symbol())
    }

    pub fn from_numeric_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.numeric_code() == code)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClientError::InvalidArgument(format!("unknown currency code: {s}")))
    }
}

macro_rules! nationalities {
    ($($variant:ident => $tag:literal, $code:literal, $short:literal, $full:literal;)+) => {
        /// Citizenship, stored by variant tag (e.g. `RUSSIA`).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum Nationality {
            $(#[serde(rename = $tag)] $variant,)+
        }

        impl Nationality {
            pub const ALL: &'static [Nationality] = &[$(Nationality::$variant,)+];

            /// Stored and serialized tag.
            pub fn tag(self) -> &'static str {
                match self { $(Nationality::$variant => $tag,)+ }
            }

            /// ISO 3166-1 alpha-2, `XX` for OTHER.
            pub fn code(self) -> &'static str {
                match self { $(Nationality::$variant => $code,)+ }
            }

            pub fn short_name(self) -> &'static str {
                match self { $(Nationality::$variant => $short,)+ }
            }

            pub fn full_name(self) -> &'static str {
                match self { $(Nationality::$variant => $full,)+ }
            }
        }
    };
}

nationalities! {
    Russia => "RUSSIA", "RU", "Russia", "Russian Federation";
    Ukraine => "UKRAINE", "UA", "Ukraine", "Ukraine";
    Belarus => "BELARUS", "BY", "Belarus", "Republic of Belarus";
    Kazakhstan => "KAZAKHSTAN", "KZ", "Kazakhstan", "Republic of Kazakhstan";
    Uzbekistan => "UZBEKISTAN", "UZ", "Uzbekistan", "Republic of Uzbekistan";
    Tajikistan => "TAJIKISTAN", "TJ", "Tajikistan", "Republic of Tajikistan";
    Kyrgyzstan => "KYRGYZSTAN", "KG", "Kyrgyzstan", "Kyrgyz Republic";
    Armenia => "ARMENIA", "AM", "Armenia", "Republic of Armenia";
    Azerbaijan => "AZERBAIJAN", "AZ", "Azerbaijan", "Republic of Azerbaijan";
    Moldova => "MOLDOVA", "MD", "Moldova", "Republic of Moldova";
    Georgia => "GEORGIA", "GE", "Georgia", "Georgia";
    Germany => "GERMANY", "DE", "Germany", "Federal Republic of Germany";
    France => "FRANCE", "FR", "France", "French Republic";
    Italy => "ITALY", "IT", "Italy", "Italian Republic";
    Spain => "SPAIN", "ES", "Spain", "Kingdom of Spain";
    Poland => "POLAND", "PL", "Poland", "Republic of Poland";
    Uk => "UK", "GB", "United Kingdom", "United Kingdom of Great Britain and Northern Ireland";
    Netherlands => "NETHERLANDS", "NL", "Netherlands", "Kingdom of the Netherlands";
    Belgium => "BELGIUM", "BE", "Belgium", "Kingdom of Belgium";
    Czech => "CZECH", "CZ", "Czechia", "Czech Republic";
    Austria => "AUSTRIA", "AT", "Austria", "Republic of Austria";
    Switzerland => "SWITZERLAND", "CH", "Switzerland", "Swiss Confederation";
    Sweden => "SWEDEN", "SE", "Sweden", "Kingdom of Sweden";
    Norway => "NORWAY", "NO", "Norway", "Kingdom of Norway";
    Finland => "FINLAND", "FI", "Finland", "Republic of Finland";
    Denmark => "DENMARK", "DK", "Denmark", "Kingdom of Denmark";
    China => "CHINA", "CN", "China", "People's Republic of China";
    Japan => "JAPAN", "JP", "Japan", "Japan";
    SouthKorea => "SOUTH_KOREA", "KR", "South Korea", "Republic of Korea";
    India => "INDIA", "IN", "India", "Republic of India";
    Turkey => "TURKEY", "TR", "Turkey", "Republic of Türkiye";
    Israel => "ISRAEL", "IL", "Israel", "State of Israel";
    Uae => "UAE", "AE", "UAE", "United Arab Emirates";
    SaudiArabia => "SAUDI_ARABIA", "SA", "Saudi Arabia", "Kingdom of Saudi Arabia";
    Singapore => "SINGAPORE", "SG", "Singapore", "Republic of Singapore";
    Thailand => "THAILAND", "TH", "Thailand", "Kingdom of Thailand";
    Vietnam => "VIETNAM", "VN", "Vietnam", "Socialist Republic of Vietnam";
    Usa => "USA", "US", "USA", "United States of America";
    Canada => "CANADA", "CA", "Canada", "Canada";
    Mexico => "MEXICO", "MX", "Mexico", "United Mexican States";
    Brazil => "BRAZIL", "BR", "Brazil", "Federative Republic of Brazil";
    Argentina => "ARGENTINA", "AR", "Argentina", "Argentine Republic";
    Australia => "AUSTRALIA", "AU", "Australia", "Commonwealth of Australia";
    NewZealand => "NEW_ZEALAND", "NZ", "New Zealand", "New Zealand";
    Other => "OTHER", "XX", "Other", "Other citizenship";
}

impl Nationality {
    pub fn is_cis(self) -> bool {
        use Nationality::*;
        matches!(
            self,
            Russia | Ukraine | Belarus | Kazakhstan | Uzbekistan | Tajikistan | Kyrgyzstan
                | Armenia | Azerbaijan | Moldova
        )
    }

    pub fn is_eu(self) -> bool {
        use Nationality::*;
        matches!(
            self,
            Germany | France | Italy | Spain | Poland | Netherlands | Belgium | Czech | Austria
                | Sweden | Finland | Denmark
        )
    }

    /// Regional-indicator flag, white flag for OTHER.
    pub fn flag(self) -> String {
        if self == Nationality::Other {
            return "🏳️".to_string();
        }
        self.code()
            .chars()
            .filter_map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
            .collect()
    }

    /// Lookup by ISO code; unknown codes map to OTHER.
    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|n| n.code().eq_ignore_ascii_case(code))
            .unwrap_or(Nationality::Other)
    }

    /// e.g. `🇷🇺 Russia`.
    pub fn display(self) -> String {
        format!("{} {}", self.flag(), self.short_name())
    }
}

impl fmt::Display for Nationality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Nationality {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|n| n.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClientError::InvalidArgument(format!("unknown nationality: {s}")))
    }
}

/// A stored client.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: i64,
    pub unique_id: String,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub account_number: String,
    pub currency: Currency,
    pub nationality: Nationality,
    pub phone_number: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub version: i64,
}

impl Client {
    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.last_name, self.first_name, middle)
            }
            _ => format!("{} {}", self.last_name, self.first_name),
        }
    }

    /// `Last F.M.`
    pub fn short_name(&self) -> String {
        let mut short = format!("{} ", self.last_name);
        if let Some(initial) = self.first_name.chars().next() {
            short.push(initial);
            short.push('.');
        }
        if let Some(initial) = self.middle_name.as_deref().and_then(|m| m.chars().next()) {
            short.push(initial);
            short.push('.');
        }
        short
    }

    /// Calendar-year difference, as the bank reports it.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        today.year() - self.birth_date.year()
    }

    pub fn view(&self, today: NaiveDate) -> ClientView {
        ClientView {
            id: self.id,
            unique_id: self.unique_id.clone(),
            last_name: self.last_name.clone(),
            first_name: self.first_name.clone(),
            middle_name: self.middle_name.clone(),
            full_name: self.full_name(),
            short_name: self.short_name(),
            birth_date: self.birth_date,
            age: self.age_on(today),
            account_number: self.account_number.clone(),
            formatted_account_number: format_account_number(&self.account_number),
            currency: self.currency,
            currency_display: self.currency.label(),
            nationality: self.nationality,
            nationality_display: self.nationality.display(),
            cis_citizen: self.nationality.is_cis(),
            eu_citizen: self.nationality.is_eu(),
            phone_number: self.phone_number.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }
}

/// Insert payload. Identity and audit fields are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewClient {
    pub unique_id: String,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub account_number: String,
    pub currency: Currency,
    pub nationality: Nationality,
    pub phone_number: String,
}

/// Create/update request body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInput {
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    pub middle_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Generated on create when omitted.
    pub account_number: Option<String>,
    pub currency: Option<Currency>,
    pub nationality: Option<Nationality>,
    #[serde(default)]
    pub phone_number: String,
    /// Expected row version on update. Stale values are rejected.
    pub version: Option<i64>,
}

/// Input that passed [`ClientInput::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidClientInput {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub account_number: Option<String>,
    pub currency: Currency,
    pub nationality: Nationality,
    pub phone_number: String,
    pub version: Option<i64>,
}

impl ClientInput {
    /// Check every field, reporting all problems at once.
    pub fn validate(self, today: NaiveDate) -> Result<ValidClientInput, ClientError> {
        let mut errors = BTreeMap::new();

        let last_name = self.last_name.trim().to_string();
        if let Err(msg) = check_name(&last_name, true) {
            errors.insert("lastName".to_string(), msg);
        }
        let first_name = self.first_name.trim().to_string();
        if let Err(msg) = check_name(&first_name, true) {
            errors.insert("firstName".to_string(), msg);
        }
        let middle_name = self
            .middle_name
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        if let Some(middle) = &middle_name {
            if let Err(msg) = check_name(middle, false) {
                errors.insert("middleName".to_string(), msg);
            }
        }

        match self.birth_date {
            None => {
                errors.insert("birthDate".to_string(), "is required".to_string());
            }
            Some(date) if date >= today => {
                errors.insert("birthDate".to_string(), "must be in the past".to_string());
            }
            Some(_) => {}
        }

        let account_number = self
            .account_number
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        if let Some(account) = &account_number {
            if !is_account_number(account) {
                errors.insert(
                    "accountNumber".to_string(),
                    "must be exactly 20 digits".to_string(),
                );
            }
        }

        if self.currency.is_none() {
            errors.insert("currency".to_string(), "is required".to_string());
        }
        if self.nationality.is_none() {
            errors.insert("nationality".to_string(), "is required".to_string());
        }

        let phone_number = self.phone_number.trim().to_string();
        if phone_number.is_empty() {
            errors.insert("phoneNumber".to_string(), "is required".to_string());
        } else if !is_e164(&phone_number) {
            errors.insert(
                "phoneNumber".to_string(),
                "must be in E.164 format, e.g. +79991234567".to_string(),
            );
        }

        match (self.birth_date, self.currency, self.nationality) {
            (Some(birth_date), Some(currency), Some(nationality)) if errors.is_empty() => {
                Ok(ValidClientInput {
                    last_name,
                    first_name,
                    middle_name,
                    birth_date,
                    account_number,
                    currency,
                    nationality,
                    phone_number,
                    version: self.version,
                })
            }
            _ => Err(ClientError::Validation(errors)),
        }
    }
}

/// Response shape with derived display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientView {
    pub id: i64,
    pub unique_id: String,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub full_name: String,
    pub short_name: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub account_number: String,
    pub formatted_account_number: String,
    pub currency: Currency,
    pub currency_display: String,
    pub nationality: Nationality,
    pub nationality_display: String,
    pub cis_citizen: bool,
    pub eu_citizen: bool,
    pub phone_number: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub version: i64,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = request.size.max(1);
        let total_pages = total_elements.div_ceil(u64::from(size)) as u32;
        Self {
            content,
            page: request.page,
            size,
            total_elements,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

/// Row counts per group, largest group first.
///
/// Serialized as a JSON object whose keys keep this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCounts<K>(Vec<(K, i64)>);

impl<K> GroupCounts<K> {
    /// Sorts by count descending; equal counts keep their input order.
    pub fn new(mut groups: Vec<(K, i64)>) -> Self {
        groups.sort_by(|a, b| b.1.cmp(&a.1));
        Self(groups)
    }

    pub fn get(&self, key: &K) -> Option<i64>
    where
        K: PartialEq,
    {
        self.0.iter().find(|(k, _)| k == key).map(|(_, n)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, i64)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Serialize> Serialize for GroupCounts<K> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Sortable columns. Anything else is rejected before it reaches SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    #[default]
    LastName,
    FirstName,
    BirthDate,
    AccountNumber,
    CreatedAt,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::LastName => "last_name",
            SortField::FirstName => "first_name",
            SortField::BirthDate => "birth_date",
            SortField::AccountNumber => "account_number",
            SortField::CreatedAt => "created_at",
        }
    }
}

impl FromStr for SortField {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "lastName" => Ok(SortField::LastName),
            "firstName" => Ok(SortField::FirstName),
            "birthDate" => Ok(SortField::BirthDate),
            "accountNumber" => Ok(SortField::AccountNumber),
            "createdAt" => Ok(SortField::CreatedAt),
            other => Err(ClientError::InvalidArgument(format!(
                "cannot sort by '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(ClientError::InvalidArgument(format!(
                "sort direction must be ASC or DESC, got '{s}'"
            )))
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
            ..Self::default()
        }
    }

    pub fn sorted(mut self, sort: SortField, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: SortField::default(),
            direction: SortDirection::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub term: Option<String>,
    pub currency: Option<Currency>,
    pub nationality: Option<Nationality>,
}

impl SearchFilter {
    /// Trimmed, non-empty search term.
    pub fn term(&self) -> Option<&str> {
        self.term.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Currency,
    Nationality,
}

impl GroupField {
    pub fn column(self) -> &'static str {
        match self {
            GroupField::Currency => "currency",
            GroupField::Nationality => "nationality",
        }
    }
}

/// `1234 5678 ...` grouping for display.
pub fn format_account_number(account: &str) -> String {
    if account.len() != 20 {
        return account.to_string();
    }
    account
        .as_bytes()
        .chunks(4)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_account_number(value: &str) -> bool {
    value.len() == 20 && value.bytes().all(|b| b.is_ascii_digit())
}

/// `+` then a non-zero digit then 1 to 14 more digits.
pub fn is_e164(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('+') else {
        return false;
    };
    let bytes = digits.as_bytes();
    (2..=15).contains(&bytes.len())
        && bytes[0] != b'0'
        && bytes.iter().all(|b| b.is_ascii_digit())
}

fn check_name(value: &str, required: bool) -> Result<(), String> {
    let len = value.chars().count();
    if len == 0 {
        return if required {
            Err("is required".to_string())
        } else {
            Ok(())
        };
    }
    if required && len < 2 {
        return Err("must be between 2 and 100 characters".to_string());
    }
    if len > 100 {
        return Err("must be at most 100 characters".to_string());
    }
    if !value
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '\'' || c == '-')
    {
        return Err("may contain only letters, spaces, apostrophes and hyphens".to_string());
    }
    Ok(())
}
