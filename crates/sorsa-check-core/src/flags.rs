//! Country name -> flag emoji, for the "Additional Info" section.

/// Country names as TweetScout reports them, including the short aliases it uses.
const COUNTRY_FLAGS: &[(&str, &str)] = &[
    ("Spain", "🇪🇸"),
    ("United States", "🇺🇸"),
    ("USA", "🇺🇸"),
    ("United Kingdom", "🇬🇧"),
    ("UK", "🇬🇧"),
    ("Russia", "🇷🇺"),
    ("Ukraine", "🇺🇦"),
    ("Germany", "🇩🇪"),
    ("France", "🇫🇷"),
    ("Italy", "🇮🇹"),
    ("Japan", "🇯🇵"),
    ("China", "🇨🇳"),
    ("Canada", "🇨🇦"),
    ("Australia", "🇦🇺"),
    ("Brazil", "🇧🇷"),
    ("India", "🇮🇳"),
    ("Turkey", "🇹🇷"),
    ("Netherlands", "🇳🇱"),
    ("Singapore", "🇸🇬"),
    ("UAE", "🇦🇪"),
    ("United Arab Emirates", "🇦🇪"),
    ("Vietnam", "🇻🇳"),
    ("Thailand", "🇹🇭"),
    ("Indonesia", "🇮🇩"),
    ("South Korea", "🇰🇷"),
    ("Switzerland", "🇨🇭"),
    ("Hong Kong", "🇭🇰"),
    ("Portugal", "🇵🇹"),
    ("Poland", "🇵🇱"),
    ("Mexico", "🇲🇽"),
    ("Nigeria", "🇳🇬"),
    ("Argentina", "🇦🇷"),
    ("Israel", "🇮🇱"),
    ("Norway", "🇳🇴"),
    ("Sweden", "🇸🇪"),
    ("Denmark", "🇩🇰"),
    ("Finland", "🇫🇮"),
    ("Belgium", "🇧🇪"),
    ("Austria", "🇦🇹"),
    ("Ireland", "🇮🇪"),
    ("Greece", "🇬🇷"),
    ("Czech Republic", "🇨🇿"),
    ("Hungary", "🇭🇺"),
    ("Romania", "🇷🇴"),
    ("Bulgaria", "🇧🇬"),
    ("Slovakia", "🇸🇰"),
    ("Croatia", "🇭🇷"),
    ("Slovenia", "🇸🇮"),
    ("Estonia", "🇪🇪"),
    ("Latvia", "🇱🇻"),
    ("Lithuania", "🇱🇹"),
    ("South Africa", "🇿🇦"),
    ("Egypt", "🇪🇬"),
    ("Morocco", "🇲🇦"),
    ("Saudi Arabia", "🇸🇦"),
    ("Qatar", "🇶🇦"),
    ("Kuwait", "🇰🇼"),
    ("Malaysia", "🇲🇾"),
    ("Philippines", "🇵🇭"),
    ("New Zealand", "🇳🇿"),
    ("Colombia", "🇨🇴"),
    ("Chile", "🇨🇱"),
    ("Peru", "🇵🇪"),
    ("Kazakhstan", "🇰🇿"),
    ("Uzbekistan", "🇺🇿"),
    ("Georgia", "🇬🇪"),
    ("Armenia", "🇦🇲"),
    ("Azerbaijan", "🇦🇿"),
    ("Belarus", "🇧🇾"),
    ("Moldova", "🇲🇩"),
    ("Cyprus", "🇨🇾"),
    ("Malta", "🇲🇹"),
    ("Iceland", "🇮🇸"),
    ("Pakistan", "🇵🇰"),
    ("Bangladesh", "🇧🇩"),
    ("Sri Lanka", "🇱🇰"),
    ("Taiwan", "🇹🇼"),
];

/// Flag for an exact country name; `None` for anything not in the table.
pub fn flag_for(country: &str) -> Option<&'static str> {
    COUNTRY_FLAGS
        .iter()
        .find(|(name, _)| *name == country)
        .map(|(_, flag)| *flag)
}
