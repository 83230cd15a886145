use mtgsearch_lib::criteria::{decompile, Criterion};
use mtgsearch_lib::query::{
  compile, Color, ColorMode, CompareOp, Comparison, Currency, Rarity, SearchForm,
};

fn criterion(label: &str, value: &str) -> Criterion {
  Criterion::new(label, value)
}

fn assert_describes(form: &SearchForm, expected: &[Criterion]) {
  let query = compile(form);
  let described = decompile(&query);
  for item in expected {
    assert!(
      described.contains(item),
      "{:?} missing from {:?} (query: {})",
      item,
      described,
      query
    );
  }
  assert_eq!(described.len(), expected.len(), "query: {}", query);
}

#[test]
fn every_form_field_reads_back() {
  let form = SearchForm {
    query: "bolt".to_string(),
    colors: vec![Color::Red, Color::Green],
    color_identity: vec![Color::White, Color::Blue],
    types: vec!["Creature".to_string()],
    subtypes: "Time Lord".to_string(),
    oracle_text: "draw a card".to_string(),
    flavor_text: "Jace".to_string(),
    mana_value: Comparison::new(CompareOp::Ge, "3"),
    power: Comparison::new(CompareOp::Gt, "2"),
    toughness: Comparison::new(CompareOp::Le, "*"),
    loyalty: Comparison::new(CompareOp::Ne, "4"),
    rarities: vec![Rarity::Common, Rarity::Mythic],
    sets: "mh3".to_string(),
    formats: vec!["modern".to_string()],
    legal_in: "commander".to_string(),
    price: Comparison::new(CompareOp::Le, "10"),
    price_currency: Currency::Eur,
    artist: "Rebecca Guay".to_string(),
    year: Comparison::new(CompareOp::Lt, "2000"),
    is_full_art: true,
    is_promo: true,
    is_reprint: true,
    ..SearchForm::default()
  };

  let described = decompile(&compile(&form));
  assert_eq!(described[0], criterion("Name", "bolt"));

  assert_describes(
    &form,
    &[
      criterion("Name", "bolt"),
      criterion("Colors", "Red, Green"),
      criterion("Color Identity", "White, Blue"),
      criterion("Type", "creature"),
      criterion("Type", "Time Lord"),
      criterion("Text contains", "draw a card"),
      criterion("Mana Value", "≥ 3"),
      criterion("Power", "> 2"),
      criterion("Toughness", "≤ *"),
      criterion("Loyalty", "≠ 4"),
      criterion("Rarity", "Common"),
      criterion("Rarity", "Mythic"),
      criterion("Set", "mh3"),
      criterion("Format", "modern"),
      criterion("Legal in", "commander"),
      criterion("Price EUR", "≤ 10"),
      criterion("Artist", "Rebecca Guay"),
      criterion("Year", "< 2000"),
      criterion("Flavor text", "Jace"),
      criterion("Special", "Full Art"),
      criterion("Special", "Promo"),
      criterion("Special", "Reprint"),
    ],
  );
}

#[test]
fn each_color_mode_reads_back_as_colors() {
  for mode in ColorMode::ALL {
    let form = SearchForm {
      colors: vec![Color::Black, Color::Colorless],
      color_mode: *mode,
      ..SearchForm::default()
    };
    assert_describes(&form, &[criterion("Colors", "Black, Colorless")]);
  }
}

#[test]
fn each_operator_reads_back_with_its_symbol() {
  let symbols = [
    (CompareOp::Eq, "="),
    (CompareOp::Lt, "<"),
    (CompareOp::Gt, ">"),
    (CompareOp::Le, "≤"),
    (CompareOp::Ge, "≥"),
    (CompareOp::Ne, "≠"),
  ];
  for (op, symbol) in symbols {
    let form = SearchForm {
      price: Comparison::new(op, "0.50"),
      price_currency: Currency::Tix,
      ..SearchForm::default()
    };
    assert_describes(&form, &[criterion("Price TIX", &format!("{} 0.50", symbol))]);
  }
}

#[test]
fn multi_word_name_and_single_rarity() {
  let form = SearchForm {
    query: "Lightning Bolt".to_string(),
    rarities: vec![Rarity::Uncommon],
    sets: "lea, 2ed".to_string(),
    ..SearchForm::default()
  };
  assert_describes(
    &form,
    &[
      criterion("Name", "Lightning Bolt"),
      criterion("Rarity", "Uncommon"),
      criterion("Set", "lea"),
      criterion("Set", "2ed"),
    ],
  );
}

#[test]
fn empty_form_describes_nothing() {
  assert!(decompile(&compile(&SearchForm::default())).is_empty());
}

#[test]
fn stray_quote_in_subtype_stays_in_its_field() {
  let form = SearchForm {
    subtypes: "Urza\"s".to_string(),
    sets: "mh3".to_string(),
    ..SearchForm::default()
  };
  assert_describes(&form, &[criterion("Type", "Urzas"), criterion("Set", "mh3")]);
}

#[test]
fn unbalanced_quote_in_name_does_not_swallow_fields() {
  let form = SearchForm {
    query: "Ach \"Hans".to_string(),
    colors: vec![Color::Red],
    ..SearchForm::default()
  };
  assert_describes(&form, &[criterion("Name", "Ach Hans"), criterion("Colors", "Red")]);
}

#[test]
fn parentheses_inside_values_read_back_whole() {
  let form = SearchForm {
    types: vec!["Creature".to_string()],
    subtypes: "Town(s), Elf".to_string(),
    sets: "(mh3)".to_string(),
    rarities: vec![Rarity::Rare, Rarity::Mythic],
    ..SearchForm::default()
  };
  assert_describes(
    &form,
    &[
      criterion("Type", "creature"),
      criterion("Type", "Town(s)"),
      criterion("Type", "Elf"),
      criterion("Rarity", "Rare"),
      criterion("Rarity", "Mythic"),
      criterion("Set", "(mh3)"),
    ],
  );
}
