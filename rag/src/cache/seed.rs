//! Canned answers for greetings and capability questions.

/// Normalized queries the cache is seeded with.
pub const SEED_QUERIES: [&str; 7] = [
    "hi",
    "hello",
    "hey",
    "what are you",
    "who are you",
    "what can you do",
    "help",
];

/// Languages with localized seed responses.
pub const SUPPORTED_LANGUAGES: [&str; 10] =
    ["en", "es", "fr", "de", "it", "pt", "ja", "zh", "ko", "ru"];

/// Localized seed responses, in the order of [`SEED_QUERIES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedCatalog {
    language: &'static str,
    responses: [&'static str; 7],
}

impl SeedCatalog {
    /// Catalog for `language`. Unknown languages get English.
    #[must_use]
    pub fn for_language(language: &str) -> Self {
        let (language, responses) = match language {
            "es" => ("es", ES),
            "fr" => ("fr", FR),
            "de" => ("de", DE),
            "it" => ("it", IT),
            "pt" => ("pt", PT),
            "ja" => ("ja", JA),
            "zh" => ("zh", ZH),
            "ko" => ("ko", KO),
            "ru" => ("ru", RU),
            _ => ("en", EN),
        };
        Self {
            language,
            responses,
        }
    }

    /// Language the responses are written in.
    #[must_use]
    pub const fn language(&self) -> &'static str {
        self.language
    }

    /// `(normalized query, response)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        SEED_QUERIES.iter().copied().zip(self.responses.iter().copied())
    }

    /// Returns `true` if `normalized` is one of the seeded queries.
    #[must_use]
    pub fn contains(normalized: &str) -> bool {
        SEED_QUERIES.contains(&normalized)
    }
}

const EN: [&str; 7] = [
    "Hi! I'm Confidant. How can I help you today?",
    "Hello! I'm Confidant, your private health assistant. What would you like to know?",
    "Hey there! What's on your mind?",
    "I'm Confidant, an AI assistant that runs entirely on your device. I can answer general health questions and help you keep track of personal notes.",
    "I'm Confidant, a private AI assistant for health questions. Everything stays on your device.",
    "I can answer general health and wellbeing questions, draw on your personal notes for context, and help you think through symptoms. I'm not a substitute for professional medical advice.",
    "Ask me any health or wellbeing question in your own words. You can also add personal notes so my answers take your situation into account.",
];

const ES: [&str; 7] = [
    "¡Hola! Soy Confidant. ¿En qué puedo ayudarte hoy?",
    "¡Hola! Soy Confidant, tu asistente de salud privado. ¿Qué te gustaría saber?",
    "¡Hola! ¿Qué tienes en mente?",
    "Soy Confidant, un asistente de IA que funciona completamente en tu dispositivo. Puedo responder preguntas generales de salud y ayudarte con tus notas personales.",
    "Soy Confidant, un asistente de IA privado para preguntas de salud. Todo se queda en tu dispositivo.",
    "Puedo responder preguntas generales de salud y bienestar, usar tus notas personales como contexto y ayudarte a entender síntomas. No sustituyo el consejo médico profesional.",
    "Hazme cualquier pregunta de salud o bienestar con tus propias palabras. También puedes añadir notas personales para que mis respuestas tengan en cuenta tu situación.",
];

const FR: [&str; 7] = [
    "Bonjour ! Je suis Confidant. Comment puis-je vous aider aujourd'hui ?",
    "Bonjour ! Je suis Confidant, votre assistant santé privé. Que souhaitez-vous savoir ?",
    "Salut ! Qu'avez-vous en tête ?",
    "Je suis Confidant, un assistant IA qui fonctionne entièrement sur votre appareil. Je réponds aux questions de santé générales et vous aide avec vos notes personnelles.",
    "Je suis Confidant, un assistant IA privé pour les questions de santé. Tout reste sur votre appareil.",
    "Je peux répondre à des questions générales de santé et de bien-être, m'appuyer sur vos notes personnelles et vous aider à comprendre des symptômes. Je ne remplace pas un avis médical professionnel.",
    "Posez-moi n'importe quelle question de santé ou de bien-être avec vos propres mots. Vous pouvez aussi ajouter des notes personnelles pour que mes réponses tiennent compte de votre situation.",
];

const DE: [&str; 7] = [
    "Hallo! Ich bin Confidant. Wie kann ich dir heute helfen?",
    "Hallo! Ich bin Confidant, dein privater Gesundheitsassistent. Was möchtest du wissen?",
    "Hey! Was beschäftigt dich?",
    "Ich bin Confidant, ein KI-Assistent, der vollständig auf deinem Gerät läuft. Ich beantworte allgemeine Gesundheitsfragen und helfe dir mit deinen persönlichen Notizen.",
    "Ich bin Confidant, ein privater KI-Assistent für Gesundheitsfragen. Alles bleibt auf deinem Gerät.",
    "Ich kann allgemeine Fragen zu Gesundheit und Wohlbefinden beantworten, deine persönlichen Notizen als Kontext nutzen und dir helfen, Symptome einzuordnen. Ich ersetze keine ärztliche Beratung.",
    "Stell mir jede Frage zu Gesundheit oder Wohlbefinden in deinen eigenen Worten. Du kannst auch persönliche Notizen hinzufügen, damit meine Antworten deine Situation berücksichtigen.",
];

const IT: [&str; 7] = [
    "Ciao! Sono Confidant. Come posso aiutarti oggi?",
    "Ciao! Sono Confidant, il tuo assistente sanitario privato. Cosa vorresti sapere?",
    "Ehi! A cosa stai pensando?",
    "Sono Confidant, un assistente IA che funziona interamente sul tuo dispositivo. Posso rispondere a domande generali sulla salute e aiutarti con le tue note personali.",
    "Sono Confidant, un assistente IA privato per domande sulla salute. Tutto resta sul tuo dispositivo.",
    "Posso rispondere a domande generali su salute e benessere, usare le tue note personali come contesto e aiutarti a capire i sintomi. Non sostituisco il parere di un medico.",
    "Fammi qualsiasi domanda su salute o benessere con parole tue. Puoi anche aggiungere note personali così le mie risposte terranno conto della tua situazione.",
];

const PT: [&str; 7] = [
    "Olá! Eu sou o Confidant. Como posso ajudar hoje?",
    "Olá! Eu sou o Confidant, seu assistente de saúde privado. O que você gostaria de saber?",
    "Oi! O que está pensando?",
    "Eu sou o Confidant, um assistente de IA que funciona inteiramente no seu dispositivo. Posso responder perguntas gerais de saúde e ajudar com suas notas pessoais.",
    "Eu sou o Confidant, um assistente de IA privado para perguntas de saúde. Tudo fica no seu dispositivo.",
    "Posso responder perguntas gerais de saúde e bem-estar, usar suas notas pessoais como contexto e ajudar você a entender sintomas. Não substituo o aconselhamento médico profissional.",
    "Faça qualquer pergunta de saúde ou bem-estar com suas próprias palavras. Você também pode adicionar notas pessoais para que minhas respostas considerem sua situação.",
];

const JA: [&str; 7] = [
    "こんにちは！Confidantです。今日はどのようにお手伝いできますか？",
    "こんにちは！プライベートな健康アシスタントのConfidantです。何を知りたいですか？",
    "やあ！何か気になることはありますか？",
    "私はConfidant、お使いのデバイス上だけで動作するAIアシスタントです。一般的な健康の質問に答えたり、個人メモの管理をお手伝いしたりします。",
    "私はConfidant、健康に関する質問のためのプライベートなAIアシスタントです。すべてのデータはデバイス内に保存されます。",
    "一般的な健康やウェルビーイングの質問に答え、個人メモを参考にし、症状の理解をお手伝いできます。専門的な医療アドバイスの代わりにはなりません。",
    "健康やウェルビーイングについて、ご自身の言葉で何でも質問してください。個人メモを追加すると、あなたの状況に合わせた回答ができます。",
];

const ZH: [&str; 7] = [
    "你好！我是 Confidant。今天有什么可以帮你的吗？",
    "你好！我是 Confidant，你的私人健康助手。你想了解什么？",
    "嘿！你在想什么？",
    "我是 Confidant，一个完全在你的设备上运行的 AI 助手。我可以回答一般健康问题，并帮助你管理个人笔记。",
    "我是 Confidant，一个用于健康问题的私人 AI 助手。所有数据都保留在你的设备上。",
    "我可以回答一般的健康和保健问题，参考你的个人笔记，并帮助你理解症状。我不能替代专业医疗建议。",
    "用你自己的话问我任何健康或保健问题。你也可以添加个人笔记，让我的回答考虑到你的情况。",
];

const KO: [&str; 7] = [
    "안녕하세요! 저는 Confidant입니다. 오늘 무엇을 도와드릴까요?",
    "안녕하세요! 개인 건강 도우미 Confidant입니다. 무엇이 궁금하신가요?",
    "안녕! 무슨 생각을 하고 계세요?",
    "저는 기기에서만 실행되는 AI 도우미 Confidant입니다. 일반적인 건강 질문에 답하고 개인 메모 관리를 도와드립니다.",
    "저는 건강 질문을 위한 개인 AI 도우미 Confidant입니다. 모든 데이터는 기기에 남아 있습니다.",
    "일반적인 건강 및 웰빙 질문에 답하고, 개인 메모를 참고하며, 증상을 이해하도록 도와드릴 수 있습니다. 전문적인 의료 조언을 대신하지는 않습니다.",
    "건강이나 웰빙에 관한 질문을 편하게 해 주세요. 개인 메모를 추가하면 상황에 맞춘 답변을 드릴 수 있습니다.",
];

const RU: [&str; 7] = [
    "Привет! Я Confidant. Чем могу помочь сегодня?",
    "Здравствуйте! Я Confidant, ваш личный помощник по вопросам здоровья. Что вы хотели бы узнать?",
    "Привет! О чём вы думаете?",
    "Я Confidant, ИИ-помощник, который работает полностью на вашем устройстве. Я отвечаю на общие вопросы о здоровье и помогаю с личными заметками.",
    "Я Confidant, приватный ИИ-помощник для вопросов о здоровье. Все данные остаются на вашем устройстве.",
    "Я могу отвечать на общие вопросы о здоровье и самочувствии, учитывать ваши личные заметки и помогать разобраться в симптомах. Я не заменяю профессиональную медицинскую консультацию.",
    "Задайте любой вопрос о здоровье или самочувствии своими словами. Вы также можете добавить личные заметки, чтобы мои ответы учитывали вашу ситуацию.",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::normalize;

    #[test]
    fn seed_queries_are_normalized() {
        for query in SEED_QUERIES {
            assert_eq!(normalize(query), query);
        }
    }

    #[test]
    fn every_supported_language_has_its_own_catalog() {
        for language in SUPPORTED_LANGUAGES {
            let catalog = SeedCatalog::for_language(language);
            assert_eq!(catalog.language(), language);
            assert_eq!(catalog.entries().count(), SEED_QUERIES.len());
        }
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let catalog = SeedCatalog::for_language("xx");
        assert_eq!(catalog.language(), "en");
        assert_eq!(catalog, SeedCatalog::for_language("en"));
    }

    #[test]
    fn contains_matches_only_seed_keys() {
        assert!(SeedCatalog::contains("what can you do"));
        assert!(!SeedCatalog::contains("What can you do?"));
    }
}
