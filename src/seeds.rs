//! Built-in question bank so the app is useful without any external config.

use crate::domain::{Question, QuestionKind, Translation, VocabularyWord, WordExample, WordExplanation};

fn q(id: u32, kind: QuestionKind, prompt: &str, example: &str, scenario: Option<&str>) -> Question {
  Question {
    id,
    kind,
    prompt: prompt.into(),
    example: example.into(),
    scenario: scenario.map(Into::into),
    image_url: None,
    voice_url: None,
    words: vec![],
    active: true,
  }
}

fn tr(pairs: &[(&str, &str)]) -> Vec<Translation> {
  pairs.iter().map(|(lang, text)| Translation { lang: lang.to_string(), text: text.to_string() }).collect()
}

fn word(
  id: u32,
  word: &str,
  definition: &str,
  translations: &[(&str, &str)],
  example: (&str, &[(&str, &str)]),
  explanation: (&str, &[(&str, &str)]),
) -> VocabularyWord {
  VocabularyWord {
    id,
    word: word.into(),
    definition: definition.into(),
    translations: tr(translations),
    has_info: true,
    examples: vec![WordExample { value: example.0.into(), voice_url: None, translations: tr(example.1) }],
    explanations: vec![WordExplanation { value: explanation.0.into(), image: None, translations: tr(explanation.1) }],
    story: None,
    miniature: None,
    active: true,
  }
}

pub fn seed_questions() -> Vec<Question> {
  use QuestionKind::*;
  let mut give_up = q(3, Quiz, "What does it mean to 'give up' something? Use it in a sentence.", "I gave up sugar last year.", None);
  give_up.words = vec![word(
    1,
    "give up",
    "to stop doing or trying to do something",
    &[("es", "rendirse, dejar de"), ("pt", "desistir"), ("zh-Hans", "放弃")],
    ("She never gives up, even when it is hard.", &[("es", "Ella nunca se rinde, incluso cuando es difícil.")]),
    ("Used for habits you quit or efforts you abandon.", &[("es", "Se usa para hábitos que dejas o esfuerzos que abandonas.")]),
  )];

  let mut look = q(4, Quiz, "Explain the difference between 'look for' and 'look after'.", "I look after my sister; I look for my keys.", None);
  look.words = vec![
    word(
      2,
      "look for",
      "to try to find something",
      &[("es", "buscar"), ("pt", "procurar")],
      ("I am looking for my glasses.", &[("es", "Estoy buscando mis gafas.")]),
      ("The object is missing and you search for it.", &[("es", "El objeto falta y lo buscas.")]),
    ),
    word(
      3,
      "look after",
      "to take care of someone or something",
      &[("es", "cuidar"), ("pt", "cuidar de")],
      ("Can you look after my dog this weekend?", &[("es", "¿Puedes cuidar a mi perro este fin de semana?")]),
      ("You are responsible for someone's wellbeing.", &[("es", "Eres responsable del bienestar de alguien.")]),
    ),
  ];

  vec![
    q(1, Describe, "Describe your favourite place in your city.", "My favourite place is a small park near the river...", None),
    q(2, Describe, "Describe what you did last weekend.", "Last weekend I went hiking with my friends...", None),
    give_up,
    look,
    q(5, Opinion, "Is it better to work from home or from an office? Why?", "I think working from home is better because...", None),
    q(6, Opinion, "Should schools teach cooking? Give two reasons.", "Schools should teach cooking because...", None),
    q(
      7,
      Scenario,
      "You are at a hotel and your room is not ready. Talk to the receptionist.",
      "Excuse me, I booked a room but it isn't ready yet...",
      Some("Hotel reception, late afternoon. You are tired after a long flight."),
    ),
    q(
      8,
      Scenario,
      "Your friend wants to cancel your weekend trip. Convince them to come.",
      "Come on, we have been planning this for weeks...",
      Some("Phone call with a friend on Thursday evening."),
    ),
  ]
}
