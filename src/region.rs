//! Region normalization: free-text origin → canonical provincial-level name.
//!
//! Operators type whatever the customer said ("苏州", "江苏南京", "Shanghai").
//! Statistics and the climate hint in the analysis prompt both need one of
//! the 34 provincial-level divisions, so every input is folded onto that
//! closed set. Anything unrecognized lands in `FALLBACK_REGION`.

/// Returned for empty or unrecognized input.
pub const FALLBACK_REGION: &str = "其他地区";

struct Province {
    name: &'static str,
    short: &'static str,
    latin: &'static [&'static str],
    cities: &'static [&'static str],
}

const PROVINCES: &[Province] = &[
    Province { name: "北京市", short: "北京", latin: &["beijing", "peking"], cities: &[] },
    Province { name: "天津市", short: "天津", latin: &["tianjin"], cities: &[] },
    Province { name: "上海市", short: "上海", latin: &["shanghai"], cities: &[] },
    Province { name: "重庆市", short: "重庆", latin: &["chongqing"], cities: &[] },
    Province {
        name: "河北省",
        short: "河北",
        latin: &["hebei"],
        cities: &["石家庄", "唐山", "保定", "邯郸", "秦皇岛", "廊坊", "沧州", "张家口", "承德", "邢台", "衡水"],
    },
    Province {
        name: "山西省",
        short: "山西",
        latin: &["shanxi"],
        cities: &["太原", "大同", "运城", "临汾", "长治", "晋中"],
    },
    Province {
        name: "辽宁省",
        short: "辽宁",
        latin: &["liaoning"],
        cities: &["沈阳", "大连", "鞍山", "抚顺", "锦州", "丹东", "营口"],
    },
    Province {
        name: "吉林省",
        short: "吉林",
        latin: &["jilin"],
        cities: &["长春", "四平", "延边", "通化"],
    },
    Province {
        name: "黑龙江省",
        short: "黑龙江",
        latin: &["heilongjiang"],
        cities: &["哈尔滨", "齐齐哈尔", "大庆", "牡丹江", "佳木斯"],
    },
    Province {
        name: "江苏省",
        short: "江苏",
        latin: &["jiangsu"],
        cities: &["南京", "苏州", "无锡", "常州", "南通", "徐州", "扬州", "镇江", "泰州", "盐城", "连云港", "淮安", "宿迁"],
    },
    Province {
        name: "浙江省",
        short: "浙江",
        latin: &["zhejiang"],
        cities: &["杭州", "宁波", "温州", "绍兴", "嘉兴", "湖州", "金华", "台州", "舟山", "丽水", "衢州", "义乌"],
    },
    Province {
        name: "安徽省",
        short: "安徽",
        latin: &["anhui"],
        cities: &["合肥", "芜湖", "蚌埠", "安庆", "马鞍山", "阜阳", "黄山"],
    },
    Province {
        name: "福建省",
        short: "福建",
        latin: &["fujian"],
        cities: &["福州", "厦门", "泉州", "漳州", "莆田", "龙岩", "三明", "宁德"],
    },
    Province {
        name: "江西省",
        short: "江西",
        latin: &["jiangxi"],
        cities: &["南昌", "赣州", "九江", "上饶", "景德镇"],
    },
    Province {
        name: "山东省",
        short: "山东",
        latin: &["shandong"],
        cities: &["济南", "青岛", "烟台", "潍坊", "淄博", "临沂", "济宁", "威海", "日照", "泰安"],
    },
    Province {
        name: "河南省",
        short: "河南",
        latin: &["henan"],
        cities: &["郑州", "洛阳", "开封", "新乡", "南阳", "安阳", "商丘", "许昌"],
    },
    Province {
        name: "湖北省",
        short: "湖北",
        latin: &["hubei"],
        cities: &["武汉", "宜昌", "襄阳", "荆州", "十堰", "黄冈"],
    },
    Province {
        name: "湖南省",
        short: "湖南",
        latin: &["hunan"],
        cities: &["长沙", "株洲", "湘潭", "衡阳", "岳阳", "常德", "郴州"],
    },
    Province {
        name: "广东省",
        short: "广东",
        latin: &["guangdong", "canton"],
        cities: &["广州", "深圳", "东莞", "佛山", "珠海", "中山", "惠州", "汕头", "江门", "湛江", "肇庆"],
    },
    Province {
        name: "海南省",
        short: "海南",
        latin: &["hainan"],
        cities: &["海口", "三亚", "儋州"],
    },
    Province {
        name: "四川省",
        short: "四川",
        latin: &["sichuan"],
        cities: &["成都", "绵阳", "德阳", "宜宾", "南充", "乐山", "泸州"],
    },
    Province {
        name: "贵州省",
        short: "贵州",
        latin: &["guizhou"],
        cities: &["贵阳", "遵义", "六盘水", "安顺"],
    },
    Province {
        name: "云南省",
        short: "云南",
        latin: &["yunnan"],
        cities: &["昆明", "大理", "丽江", "曲靖", "玉溪", "西双版纳"],
    },
    Province {
        name: "陕西省",
        short: "陕西",
        latin: &["shaanxi"],
        cities: &["西安", "咸阳", "宝鸡", "延安", "榆林", "汉中"],
    },
    Province {
        name: "甘肃省",
        short: "甘肃",
        latin: &["gansu"],
        cities: &["兰州", "天水", "酒泉", "嘉峪关", "张掖"],
    },
    Province {
        name: "青海省",
        short: "青海",
        latin: &["qinghai"],
        cities: &["西宁", "格尔木"],
    },
    Province {
        name: "台湾省",
        short: "台湾",
        latin: &["taiwan"],
        cities: &["台北", "高雄", "台中", "台南", "新竹"],
    },
    Province {
        name: "内蒙古自治区",
        short: "内蒙古",
        latin: &["neimenggu", "innermongolia"],
        cities: &["呼和浩特", "包头", "鄂尔多斯", "赤峰", "呼伦贝尔"],
    },
    Province {
        name: "广西壮族自治区",
        short: "广西",
        latin: &["guangxi"],
        cities: &["南宁", "桂林", "柳州", "北海", "梧州"],
    },
    Province {
        name: "西藏自治区",
        short: "西藏",
        latin: &["xizang", "tibet"],
        cities: &["拉萨", "日喀则", "林芝"],
    },
    Province {
        name: "宁夏回族自治区",
        short: "宁夏",
        latin: &["ningxia"],
        cities: &["银川", "石嘴山", "固原"],
    },
    Province {
        name: "新疆维吾尔自治区",
        short: "新疆",
        latin: &["xinjiang"],
        cities: &["乌鲁木齐", "喀什", "克拉玛依", "伊犁", "吐鲁番", "哈密"],
    },
    Province { name: "香港特别行政区", short: "香港", latin: &["hongkong", "hk"], cities: &[] },
    Province { name: "澳门特别行政区", short: "澳门", latin: &["macau", "macao"], cities: &[] },
];

/// Map an arbitrary region string onto one canonical province name.
///
/// Total over all inputs: never returns an empty string or the raw input
/// unless the raw input already is a canonical name.
///
/// Match order: canonical name, short-name prefix ("江苏南京"), city name
/// (earliest occurrence wins, "南京中山路" → 江苏省), short name anywhere
/// ("中国江苏"), then Latin spelling ("Jiangsu Province").
pub fn normalize_to_province(input: &str) -> &'static str {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return FALLBACK_REGION;
    }

    if let Some(p) = PROVINCES.iter().find(|p| p.name == trimmed) {
        return p.name;
    }

    if let Some(p) = PROVINCES.iter().find(|p| trimmed.starts_with(p.short)) {
        return p.name;
    }

    if let Some(name) = match_city(trimmed) {
        return name;
    }

    if let Some(p) = PROVINCES.iter().find(|p| trimmed.contains(p.short)) {
        return p.name;
    }

    let latin = latin_key(trimmed);
    if !latin.is_empty() {
        if let Some(p) = PROVINCES
            .iter()
            .find(|p| p.latin.iter().any(|alias| *alias == latin))
        {
            return p.name;
        }
    }

    FALLBACK_REGION
}

/// Whether `name` is one of the canonical provincial-level names.
pub fn is_canonical(name: &str) -> bool {
    PROVINCES.iter().any(|p| p.name == name)
}

/// All canonical names, in administrative order.
pub fn canonical_provinces() -> impl Iterator<Item = &'static str> {
    PROVINCES.iter().map(|p| p.name)
}

fn match_city(input: &str) -> Option<&'static str> {
    PROVINCES
        .iter()
        .flat_map(|p| p.cities.iter().map(move |city| (p.name, *city)))
        .filter_map(|(province, city)| input.find(city).map(|pos| (pos, city.len(), province)))
        // Earliest position first; at equal position prefer the longer city name.
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, _, province)| province)
}

/// Lowercased ASCII letters with administrative suffixes removed.
fn latin_key(input: &str) -> String {
    let letters: String = input
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    ["province", "city", "sheng", "shi"]
        .iter()
        .find_map(|suffix| letters.strip_suffix(suffix).filter(|rest| !rest.is_empty()))
        .map(str::to_string)
        .unwrap_or(letters)
}
