//! Fixed user-facing texts.

pub const GREETING: &str = "🍕 Вітаю у Фіче Піца!\n\nНатисніть кнопку меню або надішліть голосове повідомлення із замовленням.";
pub const HELP: &str = "Скажіть або напишіть, що бажаєте замовити. Кнопки: «📜 Меню», «💰 Розрахувати чек», «🗑 Очистити кошик».";
pub const ACKNOWLEDGED: &str = "Зрозумів.";
pub const INTERPRETER_ERROR: &str = "Помилка AI.";
pub const NOT_UNDERSTOOD: &str = "😕 Не розібрав слів.";
pub const LISTENING: &str = "🎧 Слухаю...";
pub const CART_EMPTY: &str = "🛒 Ваш кошик порожній.";
pub const CART_CLEARED: &str = "🗑 Кошик очищено.";
pub const ORDER_PLACED: &str = "✅ Замовлення оформлено! Чекайте на доставку.";
pub const INTERNAL_ERROR: &str = "Сталася помилка.";
pub const UNSUPPORTED_MESSAGE: &str = "Надішліть текст або голосове повідомлення.";

pub const MENU_HEADER: &str = "📜 МЕНЮ ПІЦЕРІЇ:";
pub const MENU_FOOTER: &str = "...та багато іншого! Скажіть, що бажаєте.";
pub const MENU_UNAVAILABLE: &str = "📜 Меню тимчасово недоступне.";

pub const RECEIPT_HEADER: &str = "🧾 ВАШЕ ЗАМОВЛЕННЯ:";
pub const CURRENCY: &str = "грн";

pub fn transcript_echo(transcript: &str) -> String {
    format!("🗣 Ви сказали: {transcript}")
}
